//! Artifact publishing.
//!
//! A publish resolves each [`Transfer`] against the build's base directory,
//! then uploads the matched files through a client connected to a stored
//! host configuration.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use dropbox_publisher_client::{ClientFactory, HostClient};
use dropbox_publisher_common::{BuildInfo, Transfer, join_remote_path, normalize_remote_path};

use crate::error::{Error, Result};
use crate::store::ConfigurationStore;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A local file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    /// File on disk.
    pub local: PathBuf,
    /// Path relative to the base directory, `/`-separated.
    pub relative: String,
    /// Destination in Dropbox API form.
    pub remote_path: String,
}

/// Outcome of a publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Host configuration the files went to.
    pub host: String,
    /// Start time of the build the files came from.
    pub build_time: DateTime<Utc>,
    /// Uploaded files, in upload order.
    pub uploads: Vec<PlannedUpload>,
    /// Total bytes reported by the host.
    pub bytes: u64,
}

impl PublishReport {
    /// Number of files uploaded.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.uploads.len()
    }
}

/// Publishes transfers to stored host configurations.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<ConfigurationStore>,
    factory: Arc<dyn ClientFactory>,
}

impl Publisher {
    /// Creates a publisher resolving hosts from `store`.
    pub fn new(store: Arc<ConfigurationStore>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { store, factory }
    }

    /// Uploads every file matched by `transfers` to the host named `host_name`.
    ///
    /// The client is disconnected whether or not the transfers succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No host configuration is named `host_name`
    /// - A pattern is invalid or a matched file lies outside `remove_prefix`
    /// - Connecting, creating a folder, or uploading fails
    #[instrument(skip(self, transfers, build_info), fields(transfer_count = transfers.len()))]
    pub async fn publish(
        &self,
        host_name: &str,
        transfers: &[Transfer],
        build_info: &BuildInfo,
    ) -> Result<PublishReport> {
        let host = self
            .store
            .configuration(host_name)
            .ok_or_else(|| Error::HostNotFound(host_name.to_string()))?;

        let mut client = self.factory.create_client(&host, build_info).await?;

        let outcome = run_transfers(client.as_mut(), transfers, build_info).await;
        let disconnected = client.disconnect().await;

        let (uploads, bytes) = match (outcome, disconnected) {
            (Ok(done), Ok(())) => done,
            (Ok(_), Err(e)) => return Err(e.into()),
            (Err(e), disconnected) => {
                if let Err(disconnect_error) = disconnected {
                    warn!(error = %disconnect_error, "Disconnect after failed publish also failed");
                }
                return Err(e);
            }
        };

        build_info.println(&format!(
            "Transferred {} file(s) to {}",
            uploads.len(),
            host.name
        ));
        info!(host = %host.name, files = uploads.len(), bytes, "Publish complete");

        Ok(PublishReport {
            host: host.name,
            build_time: build_info.build_time(),
            uploads,
            bytes,
        })
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

async fn run_transfers(
    client: &mut dyn HostClient,
    transfers: &[Transfer],
    build_info: &BuildInfo,
) -> Result<(Vec<PlannedUpload>, u64)> {
    let remote_root = client.remote_root().to_string();
    let mut created = HashSet::new();
    let mut uploads = Vec::new();
    let mut bytes = 0;

    for transfer in transfers {
        let planned = plan_transfer(transfer, build_info.base_directory(), &remote_root)?;
        if planned.is_empty() {
            build_info.println(&format!("No files matched '{}'", transfer.source_files));
            continue;
        }

        for upload in planned {
            if let Some((folder, _)) = upload.remote_path.rsplit_once('/')
                && !folder.is_empty()
                && created.insert(folder.to_string())
            {
                client.create_folder(folder).await?;
            }

            build_info.println(&format!(
                "Uploading {} to {}",
                upload.relative, upload.remote_path
            ));
            let metadata = client.upload(&upload.local, &upload.remote_path).await?;
            bytes += metadata.size.unwrap_or(0);
            uploads.push(upload);
        }
    }

    Ok((uploads, bytes))
}

/// Resolves one transfer into uploads.
///
/// Matches are files only, deduplicated, in pattern order then path order.
///
/// # Errors
///
/// Returns an error if:
/// - The transfer has no source patterns
/// - A pattern is invalid
/// - A matched file does not start with `remove_prefix`
pub fn plan_transfer(
    transfer: &Transfer,
    base_directory: &Path,
    remote_root: &str,
) -> Result<Vec<PlannedUpload>> {
    let sources = transfer.source_patterns();
    if sources.is_empty() {
        return Err(Error::Transfer("No source files configured".to_string()));
    }

    let excludes = transfer
        .exclude_patterns()
        .into_iter()
        .map(Pattern::new)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let base = base_directory.to_str().ok_or_else(|| {
        Error::Transfer(format!(
            "Base directory is not valid UTF-8: {}",
            base_directory.display()
        ))
    })?;
    let escaped_base = Pattern::escape(base.trim_end_matches(['/', '\\']));

    let prefix = normalize_remote_path(&transfer.remove_prefix);
    let remote_dir = join_remote_path([remote_root, transfer.remote_directory.as_str()]);

    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    for source in sources {
        let pattern = format!("{escaped_base}/{}", source.trim_start_matches('/'));
        let mut matches = glob::glob_with(&pattern, MATCH_OPTIONS)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(glob::GlobError::into_error)?;
        matches.sort();

        for path in matches {
            if !path.is_file() || !seen.insert(path.clone()) {
                continue;
            }

            let Some(relative) = relative_path(&path, base_directory) else {
                continue;
            };

            if excludes
                .iter()
                .any(|ex| ex.matches_with(&relative, MATCH_OPTIONS))
            {
                debug!(file = %relative, "Excluded");
                continue;
            }

            let remote_relative = if transfer.flatten {
                relative
                    .rsplit('/')
                    .next()
                    .unwrap_or(relative.as_str())
                    .to_string()
            } else {
                strip_prefix(&relative, &prefix)?
            };

            planned.push(PlannedUpload {
                local: path,
                remote_path: join_remote_path([remote_dir.as_str(), remote_relative.as_str()]),
                relative,
            });
        }
    }

    Ok(planned)
}

/// `path` relative to `base`, with `/` separators.
fn relative_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Removes `prefix` (normalized, so `""` or `/a/b`) from `relative`.
fn strip_prefix(relative: &str, prefix: &str) -> Result<String> {
    if prefix.is_empty() {
        return Ok(relative.to_string());
    }

    let bare = prefix.trim_start_matches('/');
    relative
        .strip_prefix(bare)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::Transfer(format!(
                "File '{relative}' does not start with the prefix to remove '{bare}'"
            ))
        })
}
