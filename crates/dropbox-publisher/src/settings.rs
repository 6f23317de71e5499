//! Application settings.
//!
//! Settings are loaded from `~/.config/dropbox-publisher/config.toml`. Every
//! key is optional; a missing file yields the defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! host_version = "2.440.1"
//! root_path = "/var/lib/publisher"
//! hosts_file = "/etc/publisher/hosts.toml"
//!
//! [client]
//! api_base_url = "https://api.dropboxapi.com/2"
//! content_base_url = "https://content.dropboxapi.com/2"
//! chunk_size = 8388608
//! max_retries = 3
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use dropbox_publisher_client::ClientOptions;
use dropbox_publisher_client::dropbox::{DEFAULT_API_URL, DEFAULT_CHUNK_SIZE, DEFAULT_CONTENT_URL};

use crate::capabilities::HostVersion;
use crate::error::{Error, Result};
use crate::paths;

/// Largest chunk Dropbox accepts in one request (150 MiB).
pub const MAX_CHUNK_SIZE: usize = 150 * 1024 * 1024;

/// Settings loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Version of the host the publisher runs under, used by capability checks.
    /// Unknown when unset.
    #[serde(default)]
    pub host_version: Option<String>,

    /// Working directory used for diagnostic contexts.
    #[serde(default)]
    pub root_path: Option<PathBuf>,

    /// Where host configurations are persisted.
    #[serde(default)]
    pub hosts_file: Option<PathBuf>,

    /// Dropbox client settings.
    #[serde(default)]
    pub client: ClientSettings,
}

/// Dropbox client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL for RPC endpoints.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for content endpoints.
    #[serde(default = "default_content_base_url")]
    pub content_base_url: String,

    /// Upload chunk size in bytes (default: 8 MiB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Retry attempts for uploads (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            content_base_url: default_content_base_url(),
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_content_base_url() -> String {
    DEFAULT_CONTENT_URL.to_string()
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_max_retries() -> u32 {
    3
}

impl Settings {
    /// Loads settings from the default location.
    ///
    /// Reads `~/.config/dropbox-publisher/config.toml`, returning the defaults
    /// if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load() -> Result<Self> {
        match paths::settings_file() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Loads settings from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read settings file {}: {e}", path.display()))
        })?;

        let settings: Self = toml::from_str(&contents)?;
        settings.validate()?;

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The chunk size is zero or above the Dropbox limit
    /// - The host version cannot be parsed
    pub fn validate(&self) -> Result<()> {
        if self.client.chunk_size == 0 || self.client.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {}",
                self.client.chunk_size
            )));
        }

        self.host_version()?;
        Ok(())
    }

    /// Parsed host version, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `host_version` is set but malformed.
    pub fn host_version(&self) -> Result<Option<HostVersion>> {
        self.host_version
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Options for the Dropbox client factory.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_base_url: self.client.api_base_url.clone(),
            content_base_url: self.client.content_base_url.clone(),
            chunk_size: self.client.chunk_size,
            max_retries: self.client.max_retries,
        }
    }

    /// Hosts file path: the configured one, or the XDG default.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory
    /// cannot be determined.
    pub fn hosts_path(&self) -> Result<PathBuf> {
        self.hosts_file
            .clone()
            .or_else(paths::hosts_file)
            .ok_or_else(|| Error::Config("Failed to determine data directory".to_string()))
    }

    /// Root working directory for diagnostic contexts.
    ///
    /// Falls back to the application data directory, then the current directory.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.root_path
            .clone()
            .or_else(|| paths::data_dir().map(|d| d.join(paths::APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn sample_settings_toml() -> &'static str {
        r#"
host_version = "2.440.1"
root_path = "/var/lib/publisher"
hosts_file = "/etc/publisher/hosts.toml"

[client]
api_base_url = "http://localhost:8080/2"
chunk_size = 1024
max_retries = 1
        "#
    }

    #[test]
    fn test_parse_settings() {
        let settings: Settings = toml::from_str(sample_settings_toml()).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.host_version.as_deref(), Some("2.440.1"));
        assert_eq!(settings.root_path(), PathBuf::from("/var/lib/publisher"));
        assert_eq!(
            settings.hosts_path().unwrap(),
            PathBuf::from("/etc/publisher/hosts.toml")
        );

        let options = settings.client_options();
        assert_eq!(options.api_base_url, "http://localhost:8080/2");
        assert_eq!(options.content_base_url, DEFAULT_CONTENT_URL);
        assert_eq!(options.chunk_size, 1024);
        assert_eq!(options.max_retries, 1);
    }

    #[test]
    fn test_default_settings() {
        let settings: Settings = toml::from_str("").unwrap();
        settings.validate().unwrap();

        assert!(settings.host_version().unwrap().is_none());
        assert_eq!(settings.client.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.client.api_base_url, DEFAULT_API_URL);
        assert_eq!(settings.client.max_retries, 3);
    }

    #[test]
    fn test_validate_chunk_size() {
        let settings: Settings = toml::from_str("[client]\nchunk_size = 0").unwrap();
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let too_big = format!("[client]\nchunk_size = {}", MAX_CHUNK_SIZE + 1);
        let settings: Settings = toml::from_str(&too_big).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_host_version() {
        let settings: Settings = toml::from_str(r#"host_version = "two""#).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, sample_settings_toml()).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.client.chunk_size, 1024);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Settings::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
