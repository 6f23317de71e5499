//! Host configuration store and persistence.
//!
//! The store holds the ordered list of [`HostConfiguration`] records. Every
//! save replaces the whole list, and the list is written to a TOML file
//! (`~/.local/share/dropbox-publisher/hosts.toml` by default).
//!
//! ## File Layout
//!
//! ```toml
//! version = 1
//!
//! [[hosts]]
//! name = "prod"
//! token = "sl.example"
//! remote_root_dir = "/builds"
//! timeout_ms = 300000
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use dropbox_publisher_common::HostConfiguration;

use crate::error::{Error, Result};

/// Schema version written to the hosts file.
pub const SCHEMA_VERSION: u32 = 1;

/// Payload key holding the submitted records.
pub const INSTANCE_KEY: &str = "instance";

/// On-disk form of the collection.
#[derive(Debug, Serialize, Deserialize)]
struct HostsFile {
    version: u32,
    #[serde(default)]
    hosts: Vec<HostConfiguration>,
}

/// Ordered collection of host configurations.
///
/// Readers get an `Arc` snapshot, so a concurrent save never exposes a
/// partially replaced list.
pub struct ConfigurationStore {
    hosts: RwLock<Arc<[HostConfiguration]>>,
    path: Option<PathBuf>,
    /// Serializes replace-then-save so the file always holds the latest list.
    save_lock: Mutex<()>,
}

impl ConfigurationStore {
    /// Loads the store backed by `path`.
    ///
    /// A missing file yields an empty store; it is created on the first save.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read or parsed
    /// - The file declares an unsupported schema version
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let hosts = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: HostsFile = toml::from_str(&contents)?;
            if file.version != SCHEMA_VERSION {
                return Err(Error::UnsupportedSchema {
                    found: file.version,
                    expected: SCHEMA_VERSION,
                });
            }
            debug!(host_count = file.hosts.len(), "Loaded host configurations");
            file.hosts
        } else {
            debug!("No hosts file found, starting empty");
            Vec::new()
        };

        Ok(Self {
            hosts: RwLock::new(hosts.into()),
            path: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    /// Creates an empty store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            hosts: RwLock::new(Arc::from(Vec::new())),
            path: None,
            save_lock: Mutex::new(()),
        }
    }

    /// File the store persists to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the collection with the records bound from a submitted payload.
    ///
    /// The records are read from the `instance` key: absent or `null` binds
    /// nothing, an object binds one record, an array binds each element in
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binding`] if any record fails to bind, in which case
    /// the stored collection is left untouched. Returns a storage error if
    /// persisting fails; the new collection is already in effect by then.
    #[instrument(skip(self, payload))]
    pub fn configure(&self, payload: &Value) -> Result<()> {
        let records = bind_instances(payload)?;
        self.replace(records)
    }

    /// Replaces the collection with `records` and persists it.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. The in-memory collection is not
    /// rolled back.
    #[instrument(skip(self, records), fields(host_count = records.len()))]
    pub fn replace(&self, records: Vec<HostConfiguration>) -> Result<()> {
        warn_duplicates(&records);

        let _guard = self
            .save_lock
            .lock()
            .map_err(|e| Error::Storage(format!("Hosts file lock poisoned: {e}")))?;

        {
            let mut hosts = self.hosts.write().unwrap_or_else(PoisonError::into_inner);
            *hosts = records.into();
        }

        let current = self.host_configurations();
        self.save(&current)?;
        info!(host_count = current.len(), "Host configurations saved");
        Ok(())
    }

    /// Snapshot of every record, in submission order.
    #[must_use]
    pub fn host_configurations(&self) -> Arc<[HostConfiguration]> {
        Arc::clone(&self.hosts.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// The first record named `name`, if any. Names compare case-sensitively.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<HostConfiguration> {
        self.host_configurations()
            .iter()
            .find(|host| host.name == name)
            .cloned()
    }

    /// Writes the collection to disk.
    ///
    /// Uses atomic write (write to temp file, then rename) for safety.
    /// Callers hold `save_lock`.
    fn save(&self, hosts: &[HostConfiguration]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let file = HostsFile {
            version: SCHEMA_VERSION,
            hosts: hosts.to_vec(),
        };
        let contents = toml::to_string_pretty(&file)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, path)?;

        debug!(
            path = %path.display(),
            size_bytes = contents.len(),
            "Saved hosts file"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ConfigurationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationStore")
            .field("path", &self.path)
            .field("host_count", &self.host_configurations().len())
            .finish()
    }
}

/// Binds the records under the `instance` key of a submitted payload.
fn bind_instances(payload: &Value) -> Result<Vec<HostConfiguration>> {
    let bind = |value: &Value| {
        HostConfiguration::from_params(value).map_err(|e| Error::Binding(e.to_string()))
    };

    match payload.get(INSTANCE_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(bind).collect(),
        Some(item) => bind(item).map(|host| vec![host]),
    }
}

fn warn_duplicates(records: &[HostConfiguration]) {
    let mut seen = HashSet::new();
    for host in records {
        if !seen.insert(host.name.as_str()) {
            warn!(
                name = %host.name,
                "Duplicate host configuration name; lookups return the first"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup_store() -> (ConfigurationStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigurationStore::load(temp_dir.path().join("hosts.toml")).unwrap();
        (store, temp_dir)
    }

    fn names(store: &ConfigurationStore) -> Vec<String> {
        store
            .host_configurations()
            .iter()
            .map(|h| h.name.clone())
            .collect()
    }

    #[test]
    fn test_configure_preserves_order() {
        let (store, _temp) = setup_store();

        store
            .configure(&json!({
                "instance": [
                    {"name": "prod", "token": "t1", "remote_root_dir": "/builds"},
                    {"name": "staging", "token": "t2"},
                    {"name": "dev", "token": "t3", "timeout_ms": "1000"}
                ]
            }))
            .unwrap();

        assert_eq!(names(&store), vec!["prod", "staging", "dev"]);
        let dev = store.configuration("dev").unwrap();
        assert_eq!(dev.timeout_ms, 1000);
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let (store, _temp) = setup_store();

        store
            .configure(&json!({
                "instance": [
                    {"name": "prod", "token": "first"},
                    {"name": "prod", "token": "second"}
                ]
            }))
            .unwrap();

        assert_eq!(store.host_configurations().len(), 2);
        assert_eq!(store.configuration("prod").unwrap().token(), "first");
    }

    #[test]
    fn test_configuration_missing() {
        let (store, _temp) = setup_store();
        assert!(store.configuration("missing").is_none());

        store
            .configure(&json!({"instance": {"name": "prod", "token": "t"}}))
            .unwrap();
        assert!(store.configuration("missing").is_none());
        assert!(store.configuration("Prod").is_none());
        assert!(store.configuration("").is_none());
    }

    #[test]
    fn test_configure_single_object() {
        let (store, _temp) = setup_store();

        store
            .configure(&json!({"instance": {"name": "solo", "token": "t"}}))
            .unwrap();

        assert_eq!(names(&store), vec!["solo"]);
    }

    #[test]
    fn test_configure_absent_or_null_clears() {
        let (store, _temp) = setup_store();
        store
            .configure(&json!({"instance": {"name": "solo", "token": "t"}}))
            .unwrap();

        store.configure(&json!({"instance": null})).unwrap();
        assert!(store.host_configurations().is_empty());

        store
            .configure(&json!({"instance": [{"name": "a", "token": "t"}]}))
            .unwrap();
        store.configure(&json!({})).unwrap();
        assert!(store.host_configurations().is_empty());
    }

    #[test]
    fn test_binding_error_leaves_store_untouched() {
        let (store, temp) = setup_store();
        store
            .configure(&json!({"instance": {"name": "keep", "token": "t"}}))
            .unwrap();
        let before = fs::read_to_string(temp.path().join("hosts.toml")).unwrap();

        let result = store.configure(&json!({
            "instance": [
                {"name": "ok", "token": "t"},
                {"name": "bad", "token": "t", "timeout_ms": "soon"}
            ]
        }));

        assert!(matches!(result, Err(Error::Binding(_))));
        assert_eq!(names(&store), vec!["keep"]);
        let after = fs::read_to_string(temp.path().join("hosts.toml")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_token_is_binding_error() {
        let store = ConfigurationStore::in_memory();
        let result = store.configure(&json!({"instance": {"name": "prod"}}));
        assert!(matches!(result, Err(Error::Binding(_))));
    }

    #[test]
    fn test_reload_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("hosts.toml");

        let store = ConfigurationStore::load(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(ConfigurationStore::in_memory().path().is_none());
        store
            .replace(vec![
                HostConfiguration::builder()
                    .name("prod")
                    .token("secret-token")
                    .remote_root_dir("/builds")
                    .timeout_ms(5000)
                    .build(),
            ])
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("version = 1"));
        assert!(!path.with_extension("tmp").exists());

        let reloaded = ConfigurationStore::load(&path).unwrap();
        let host = reloaded.configuration("prod").unwrap();
        assert_eq!(host.token(), "secret-token");
        assert_eq!(host.remote_root_dir, "/builds");
        assert_eq!(host.timeout_ms, 5000);
    }

    #[test]
    fn test_unsupported_schema_version() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hosts.toml");
        fs::write(&path, "version = 7\n").unwrap();

        let err = ConfigurationStore::load(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedSchema {
                found: 7,
                expected: 1
            }
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hosts.toml");
        fs::write(&path, "not toml [").unwrap();

        assert!(matches!(
            ConfigurationStore::load(&path),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = ConfigurationStore::in_memory();
        store
            .configure(&json!({"instance": {"name": "old", "token": "t"}}))
            .unwrap();

        let snapshot = store.host_configurations();
        store
            .configure(&json!({"instance": {"name": "new", "token": "t"}}))
            .unwrap();

        assert_eq!(snapshot[0].name, "old");
        assert_eq!(names(&store), vec!["new"]);
    }

    #[test]
    fn test_persist_failure_keeps_new_collection() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "").unwrap();

        // Parent of the hosts file is a regular file, so the save fails
        let store = ConfigurationStore::load(blocker.join("hosts.toml")).unwrap();
        let result = store.configure(&json!({"instance": {"name": "prod", "token": "t"}}));

        assert!(result.is_err());
        assert_eq!(names(&store), vec!["prod"]);
    }

    #[test]
    fn test_concurrent_configure_keeps_disk_in_step() {
        use std::sync::Barrier;
        use std::thread;

        let (store, temp) = setup_store();
        let path = temp.path().join("hosts.toml");

        for _ in 0..50 {
            let barrier = Barrier::new(4);
            thread::scope(|scope| {
                let handles: Vec<_> = (0..4)
                    .map(|i| {
                        let store = &store;
                        let barrier = &barrier;
                        scope.spawn(move || {
                            barrier.wait();
                            store.configure(&json!({
                                "instance": {"name": format!("h{i}"), "token": "t"}
                            }))
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().unwrap().unwrap();
                }
            });

            let on_disk = ConfigurationStore::load(&path).unwrap();
            assert_eq!(names(&on_disk), names(&store));
            assert!(!path.with_extension("tmp").exists());
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let store = ConfigurationStore::in_memory();
        store
            .configure(&json!({"instance": {"name": "prod", "token": "super-secret"}}))
            .unwrap();

        let output = format!("{store:?} {:?}", store.host_configurations());
        assert!(!output.contains("super-secret"));
    }
}
