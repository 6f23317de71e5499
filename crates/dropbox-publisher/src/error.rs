//! Error types for the publisher services.

use thiserror::Error;

use dropbox_publisher_client::ClientError;

/// Errors that can occur in the publisher services.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A submitted payload could not be bound to host configurations.
    ///
    /// Nothing is stored when this is returned.
    #[error("Invalid host configuration payload: {0}")]
    Binding(String),

    /// Persisted file uses a schema version this build does not understand.
    #[error("Unsupported hosts file schema version {found} (expected {expected})")]
    UnsupportedSchema {
        /// Version found in the file.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// Host configuration not found.
    #[error("Host configuration not found: {0}")]
    HostNotFound(String),

    /// A transfer could not be resolved into uploads.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Invalid glob pattern in a transfer.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Dropbox client error.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias using the service [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
