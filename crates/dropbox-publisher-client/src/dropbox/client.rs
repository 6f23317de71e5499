//! Dropbox client implementation.
//!
//! # Features
//!
//! - **Connection check**: authenticates with `users/get_current_account` and
//!   verifies the remote root folder, with a single attempt and no retries
//! - **Uploads**: single-shot for small files, retried with exponential
//!   backoff; upload sessions for large ones, one attempt per chunk
//! - **Secure tokens**: uses the `secrecy` crate to keep tokens out of logs
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! use dropbox_publisher_client::{ClientOptions, DropboxClient, HostClient};
//! use dropbox_publisher_common::{BuildInfo, HostConfiguration};
//!
//! # async fn example() -> Result<(), dropbox_publisher_client::ClientError> {
//! let host = HostConfiguration::builder()
//!     .name("prod")
//!     .token("sl.token")
//!     .remote_root_dir("/builds")
//!     .build();
//!
//! let mut client =
//!     DropboxClient::connect(&host, &BuildInfo::dummy("."), &ClientOptions::default()).await?;
//! client.upload(Path::new("target/app.jar"), "/builds/app.jar").await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;

use dropbox_publisher_common::{BuildInfo, HostConfiguration};

use crate::error::{ClientError, ErrorResponse};
use crate::{ClientOptions, HostClient};

use super::{
    API_ARG_HEADER, Account, CommitInfo, CreateFolderArg, FileMetadata, GetMetadataArg, Metadata,
    UploadSessionAppendArg, UploadSessionCursor, UploadSessionFinishArg, UploadSessionStartArg,
    UploadSessionStartResult, header_arg,
};

/// Client for one Dropbox destination.
///
/// # Security
///
/// The access token is stored using the `secrecy` crate to prevent accidental
/// exposure through debug logs or memory dumps.
#[derive(Clone)]
pub struct DropboxClient {
    client: reqwest::Client,
    upload_client: ClientWithMiddleware,
    session_client: ClientWithMiddleware,
    token: Arc<SecretString>,
    api_base_url: String,
    content_base_url: String,
    remote_root: String,
    chunk_size: usize,
    connected: bool,
}

impl std::fmt::Debug for DropboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxClient")
            .field("token", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("content_base_url", &self.content_base_url)
            .field("remote_root", &self.remote_root)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl DropboxClient {
    /// Builds a client for `host` without contacting Dropbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, a base URL is invalid, the
    /// chunk size is zero, or the HTTP client cannot be created.
    pub fn new(host: &HostConfiguration, options: &ClientOptions) -> Result<Self, ClientError> {
        if host.token().trim().is_empty() {
            return Err(ClientError::ConfigurationError(
                "Access token is required".to_string(),
            ));
        }
        if options.chunk_size == 0 {
            return Err(ClientError::ConfigurationError(
                "Upload chunk size must be greater than zero".to_string(),
            ));
        }

        let api_base_url = validate_base_url(&options.api_base_url)?;
        let content_base_url = validate_base_url(&options.content_base_url)?;

        let client = reqwest::Client::builder()
            .timeout(host.timeout())
            .build()
            .map_err(ClientError::from_transport)?;

        // Uploads and session starts are retried. Session appends and
        // finishes advance a server-side offset, so they get one attempt.
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
        let upload_client = reqwest_middleware::ClientBuilder::new(client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let session_client = reqwest_middleware::ClientBuilder::new(client.clone()).build();

        Ok(Self {
            client,
            upload_client,
            session_client,
            token: Arc::new(host.token.clone()),
            api_base_url,
            content_base_url,
            remote_root: host.remote_root_path(),
            chunk_size: options.chunk_size,
            connected: true,
        })
    }

    /// Builds a client, authenticates, and verifies the remote root folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built, the token is rejected,
    /// or the remote root does not exist or is not a folder.
    pub async fn connect(
        host: &HostConfiguration,
        build_info: &BuildInfo,
        options: &ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Self::new(host, options)?;

        let account = client.current_account().await?;
        info!(
            "Connected to Dropbox host '{}' as account {}",
            host.name, account.account_id
        );
        build_info.println(&format!(
            "Connected to Dropbox as {}",
            account.name.display_name
        ));

        client.change_to_initial_directory().await?;
        Ok(client)
    }

    /// Looks up the account the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    pub async fn current_account(&self) -> Result<Account, ClientError> {
        self.rpc("users/get_current_account", &()).await
    }

    /// Fetches metadata for a remote path.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PathNotFound`] if the path does not exist, or
    /// another error if the request fails.
    pub async fn metadata(&self, path: &str) -> Result<Metadata, ClientError> {
        self.rpc("files/get_metadata", &GetMetadataArg { path })
            .await
            .map_err(|e| path_error(e, path))
    }

    async fn change_to_initial_directory(&self) -> Result<(), ClientError> {
        if self.remote_root.is_empty() {
            return Ok(());
        }

        match self.metadata(&self.remote_root).await? {
            Metadata::Folder(_) => {
                debug!("Remote root {} is a folder", self.remote_root);
                Ok(())
            }
            _ => Err(ClientError::NotAFolder(self.remote_root.clone())),
        }
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::Disconnected)
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Calls an RPC endpoint with a JSON argument.
    async fn rpc<A, R>(&self, endpoint: &str, arg: &A) -> Result<R, ClientError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.ensure_connected()?;
        let url = format!("{}/{endpoint}", self.api_base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(arg)?)
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        parse_response(endpoint, response).await
    }

    /// Calls a content endpoint with retries.
    async fn content<A, R>(&self, endpoint: &str, arg: &A, body: Vec<u8>) -> Result<R, ClientError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send_content(&self.upload_client, endpoint, arg, body).await
    }

    /// Calls a content endpoint once.
    async fn session_content<A, R>(
        &self,
        endpoint: &str,
        arg: &A,
        body: Vec<u8>,
    ) -> Result<R, ClientError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.send_content(&self.session_client, endpoint, arg, body).await
    }

    /// Posts to a content endpoint, passing the argument in the API header.
    async fn send_content<A, R>(
        &self,
        http: &ClientWithMiddleware,
        endpoint: &str,
        arg: &A,
        body: Vec<u8>,
    ) -> Result<R, ClientError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.ensure_connected()?;
        let url = format!("{}/{endpoint}", self.content_base_url);

        let response = http
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .header(API_ARG_HEADER, header_arg(arg)?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(ClientError::from_middleware)?;

        parse_response(endpoint, response).await
    }

    async fn upload_session(
        &self,
        file: &mut tokio::fs::File,
        size: u64,
        remote_path: &str,
    ) -> Result<FileMetadata, ClientError> {
        let first = read_chunk(file, self.chunk_size).await?;
        let mut offset = len_u64(&first);

        let started: UploadSessionStartResult = self
            .content(
                "files/upload_session/start",
                &UploadSessionStartArg { close: false },
                first,
            )
            .await?;
        let session_id = started.session_id;
        debug!("Started upload session {session_id} for {remote_path} ({size} bytes)");

        loop {
            let chunk = read_chunk(file, self.chunk_size).await?;
            let len = len_u64(&chunk);
            let cursor = UploadSessionCursor {
                session_id: &session_id,
                offset,
            };

            if chunk.is_empty() || offset + len >= size {
                let arg = UploadSessionFinishArg {
                    cursor,
                    commit: CommitInfo::overwrite(remote_path),
                };
                return self
                    .session_content("files/upload_session/finish", &arg, chunk)
                    .await;
            }

            let arg = UploadSessionAppendArg {
                cursor,
                close: false,
            };
            self.session_content::<_, serde_json::Value>(
                "files/upload_session/append_v2",
                &arg,
                chunk,
            )
            .await?;
            offset += len;
        }
    }
}

#[async_trait]
impl HostClient for DropboxClient {
    fn remote_root(&self) -> &str {
        &self.remote_root
    }

    async fn create_folder(&mut self, path: &str) -> Result<(), ClientError> {
        if path.is_empty() {
            return Ok(());
        }

        let arg = CreateFolderArg {
            path,
            autorename: false,
        };
        match self
            .rpc::<_, serde_json::Value>("files/create_folder_v2", &arg)
            .await
        {
            Ok(_) => {
                debug!("Created remote folder {path}");
                Ok(())
            }
            Err(ClientError::ApiError { status: 409, summary })
                if summary.starts_with("path/conflict/folder") =>
            {
                debug!("Remote folder {path} already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upload(
        &mut self,
        local: &Path,
        remote_path: &str,
    ) -> Result<FileMetadata, ClientError> {
        self.ensure_connected()?;

        let mut file = tokio::fs::File::open(local).await?;
        let size = file.metadata().await?.len();

        if size <= u64::try_from(self.chunk_size).unwrap_or(u64::MAX) {
            let mut body = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
            file.read_to_end(&mut body).await?;
            debug!("Uploading {} to {remote_path} ({size} bytes)", local.display());
            return self
                .content("files/upload", &CommitInfo::overwrite(remote_path), body)
                .await;
        }

        self.upload_session(&mut file, size, remote_path).await
    }

    async fn disconnect(&mut self) -> Result<(), ClientError> {
        if self.connected {
            self.connected = false;
            debug!("Disconnected from Dropbox");
        }
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<String, ClientError> {
    let trimmed = base_url.trim_end_matches('/');
    url::Url::parse(trimmed).map_err(|e| {
        ClientError::ConfigurationError(format!("Invalid base URL '{base_url}': {e}"))
    })?;
    Ok(trimmed.to_string())
}

/// Checks the status and decodes the body of an API response.
async fn parse_response<R: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<R, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let error_text = response.text().await.map_err(ClientError::from_transport)?;

        let summary = match serde_json::from_str::<ErrorResponse>(&error_text) {
            Ok(parsed) => parsed.error_summary,
            Err(parse_err) => {
                debug!("Failed to parse error response as JSON: {parse_err}. Using raw text instead.");
                error_text
            }
        };

        error!(
            "Dropbox request {endpoint} failed with status {}: {summary}",
            status.as_u16()
        );

        return Err(match status.as_u16() {
            401 => ClientError::AuthenticationError(summary),
            429 => ClientError::RateLimitError { retry_after },
            500..=599 => ClientError::ServiceUnavailable(summary),
            code => ClientError::ApiError {
                status: code,
                summary,
            },
        });
    }

    let text = response.text().await.map_err(ClientError::from_transport)?;
    debug!(
        "Raw API response from {endpoint}: {}",
        &text.chars().take(500).collect::<String>()
    );

    let body = if text.trim().is_empty() { "null" } else { &text };
    Ok(serde_json::from_str(body)?)
}

/// Turns a 409 `not_found` lookup failure into [`ClientError::PathNotFound`].
fn path_error(err: ClientError, path: &str) -> ClientError {
    match err {
        ClientError::ApiError { status: 409, summary } if summary.contains("not_found") => {
            ClientError::PathNotFound(path.to_string())
        }
        other => other,
    }
}

async fn read_chunk(file: &mut tokio::fs::File, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    file.take(u64::try_from(limit).unwrap_or(u64::MAX))
        .read_to_end(&mut buf)
        .await?;
    Ok(buf)
}

fn len_u64(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}
