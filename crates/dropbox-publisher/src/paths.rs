//! XDG-compliant path helpers.
//!
//! Respects `XDG_CONFIG_HOME` and `XDG_DATA_HOME` environment
//! variables, falling back to `~/.config` and `~/.local/share`.

use std::path::PathBuf;

/// Application directory name under the XDG base directories.
pub const APP_DIR: &str = "dropbox-publisher";

/// Returns the XDG config base directory.
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise `~/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
}

/// Returns the XDG data base directory.
///
/// Uses `XDG_DATA_HOME` if set, otherwise `~/.local/share`.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
}

/// Default settings file: `<config>/dropbox-publisher/config.toml`.
pub fn settings_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Default hosts file: `<data>/dropbox-publisher/hosts.toml`.
pub fn hosts_file() -> Option<PathBuf> {
    data_dir().map(|d| d.join(APP_DIR).join("hosts.toml"))
}
