//! # dropbox-publisher-client
//!
//! Client library for the Dropbox API as used by the publisher.
//!
//! The services never construct a client directly. They ask a
//! [`ClientFactory`] for a connected [`HostClient`], which lets tests swap in
//! fakes and lets the binary pick endpoints from its settings.
//!
//! ## Example
//!
//! ```no_run
//! use dropbox_publisher_client::{ClientFactory, ClientOptions, DropboxClientFactory};
//! use dropbox_publisher_common::{BuildInfo, HostConfiguration};
//!
//! # async fn example() -> Result<(), dropbox_publisher_client::ClientError> {
//! let host = HostConfiguration::builder()
//!     .name("prod")
//!     .token("sl.token")
//!     .remote_root_dir("/builds")
//!     .build();
//!
//! let factory = DropboxClientFactory::new(ClientOptions::default());
//! let mut client = factory.create_client(&host, &BuildInfo::dummy("/tmp")).await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use dropbox_publisher_common::{BuildInfo, HostConfiguration};

pub mod dropbox;
pub mod error;

pub use dropbox::{DropboxClient, FileMetadata};
pub use error::ClientError;

/// A connected session against one host configuration.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Remote root every transfer is placed under, in API form.
    fn remote_root(&self) -> &str;

    /// Creates a folder, succeeding if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the client is disconnected.
    async fn create_folder(&mut self, path: &str) -> Result<(), ClientError>;

    /// Uploads a local file to `remote_path`, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the upload fails, or the
    /// client is disconnected.
    async fn upload(&mut self, local: &Path, remote_path: &str)
    -> Result<FileMetadata, ClientError>;

    /// Ends the session. Calling it more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the session fails.
    async fn disconnect(&mut self) -> Result<(), ClientError>;
}

/// Creates connected clients from host configurations.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Connects to the host described by `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the host cannot
    /// be reached.
    async fn create_client(
        &self,
        host: &HostConfiguration,
        build_info: &BuildInfo,
    ) -> Result<Box<dyn HostClient>, ClientError>;
}

/// Endpoint and transfer settings shared by every client a factory creates.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL for RPC endpoints.
    pub api_base_url: String,
    /// Base URL for content endpoints.
    pub content_base_url: String,
    /// Largest upload body; larger files use upload sessions.
    pub chunk_size: usize,
    /// Retry attempts for upload requests. Connection checks never retry.
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: dropbox::DEFAULT_API_URL.to_string(),
            content_base_url: dropbox::DEFAULT_CONTENT_URL.to_string(),
            chunk_size: dropbox::DEFAULT_CHUNK_SIZE,
            max_retries: 3,
        }
    }
}

impl ClientOptions {
    /// Points both RPC and content endpoints at one base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base_url.clone_from(&base_url);
        self.content_base_url = base_url;
        self
    }

    /// Sets the upload chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Factory producing [`DropboxClient`]s.
#[derive(Debug, Clone, Default)]
pub struct DropboxClientFactory {
    options: ClientOptions,
}

impl DropboxClientFactory {
    /// Creates a factory with the given options.
    #[must_use]
    pub const fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl ClientFactory for DropboxClientFactory {
    async fn create_client(
        &self,
        host: &HostConfiguration,
        build_info: &BuildInfo,
    ) -> Result<Box<dyn HostClient>, ClientError> {
        let client = DropboxClient::connect(host, build_info, &self.options).await?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.api_base_url, "https://api.dropboxapi.com/2");
        assert_eq!(options.content_base_url, "https://content.dropboxapi.com/2");
        assert_eq!(options.chunk_size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_with_base_url_sets_both() {
        let options = ClientOptions::default()
            .with_base_url("http://localhost:9000")
            .with_chunk_size(16);
        assert_eq!(options.api_base_url, "http://localhost:9000");
        assert_eq!(options.content_base_url, "http://localhost:9000");
        assert_eq!(options.chunk_size, 16);
    }
}
