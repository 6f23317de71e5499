//! Dropbox API v2 types and client implementation.
//!
//! Only the endpoints needed to verify a destination and upload files are
//! modelled: account lookup, metadata, folder creation, single-shot upload
//! and upload sessions.

use serde::{Deserialize, Serialize};

pub mod client;
pub use client::DropboxClient;

/// Default base URL for RPC endpoints.
pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com/2";

/// Default base URL for content (upload) endpoints.
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Largest body sent in one upload request. Files above this use upload sessions.
///
/// Dropbox caps single-shot uploads at 150 MiB; sessions accept chunks of
/// the same size.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Header carrying JSON arguments for content endpoints.
pub const API_ARG_HEADER: &str = "Dropbox-API-Arg";

// ============================================================================
// Request Types
// ============================================================================

/// Argument for `files/get_metadata`.
#[derive(Debug, Clone, Serialize)]
pub struct GetMetadataArg<'a> {
    /// Path to inspect.
    pub path: &'a str,
}

/// Argument for `files/create_folder_v2`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateFolderArg<'a> {
    /// Folder to create.
    pub path: &'a str,
    /// Whether Dropbox may rename on conflict. Always false.
    pub autorename: bool,
}

/// Commit information for `files/upload` and `files/upload_session/finish`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo<'a> {
    /// Destination path.
    pub path: &'a str,
    /// Write mode; uploads always overwrite.
    pub mode: &'static str,
    /// Whether Dropbox may rename on conflict. Always false.
    pub autorename: bool,
    /// Suppress desktop notifications.
    pub mute: bool,
}

impl<'a> CommitInfo<'a> {
    /// Overwriting commit to `path`.
    #[must_use]
    pub const fn overwrite(path: &'a str) -> Self {
        Self {
            path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        }
    }
}

/// Argument for `files/upload_session/start`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSessionStartArg {
    /// Close the session after this chunk.
    pub close: bool,
}

/// Position inside an upload session.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSessionCursor<'a> {
    /// Session identifier returned by `start`.
    pub session_id: &'a str,
    /// Bytes uploaded so far.
    pub offset: u64,
}

/// Argument for `files/upload_session/append_v2`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSessionAppendArg<'a> {
    /// Where this chunk goes.
    pub cursor: UploadSessionCursor<'a>,
    /// Close the session after this chunk.
    pub close: bool,
}

/// Argument for `files/upload_session/finish`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSessionFinishArg<'a> {
    /// Where the final chunk goes.
    pub cursor: UploadSessionCursor<'a>,
    /// Destination of the assembled file.
    pub commit: CommitInfo<'a>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Display name block of an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountName {
    /// Name suitable for display.
    pub display_name: String,
}

/// Response of `users/get_current_account`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Stable account identifier.
    pub account_id: String,
    /// Account holder's name.
    pub name: AccountName,
    /// Account email, when visible to the token.
    #[serde(default)]
    pub email: Option<String>,
}

/// Metadata of an uploaded or inspected file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Last path component.
    pub name: String,
    /// Full path with original casing.
    #[serde(default)]
    pub path_display: Option<String>,
    /// File identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Metadata of a folder.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FolderMetadata {
    /// Last path component.
    pub name: String,
    /// Full path with original casing.
    #[serde(default)]
    pub path_display: Option<String>,
}

/// Response of `files/get_metadata`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum Metadata {
    /// A file.
    File(FileMetadata),
    /// A folder.
    Folder(FolderMetadata),
    /// A deleted entry.
    Deleted {
        /// Last path component.
        name: String,
    },
}

/// Response of `files/upload_session/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSessionStartResult {
    /// Identifier for subsequent append/finish calls.
    pub session_id: String,
}

/// Serializes an argument for the `Dropbox-API-Arg` header.
///
/// Header values must be ASCII, so every non-ASCII character is written as a
/// JSON `\u` escape (surrogate pairs for characters outside the BMP).
///
/// # Errors
///
/// Returns an error if the argument cannot be serialized.
pub fn header_arg<T: Serialize>(arg: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}
