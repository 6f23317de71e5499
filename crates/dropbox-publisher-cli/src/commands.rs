//! Command implementations for the CLI.
//!
//! Each command returns `Ok(true)` on success and `Ok(false)` when it ran but
//! the outcome was a failure the user should see in the exit code.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde_json::Value;

use dropbox_publisher::{
    Capabilities, ConfigurationStore, ConnectionTester, Publisher, Settings, is_applicable,
};
use dropbox_publisher_client::{ClientFactory, DropboxClientFactory};
use dropbox_publisher_common::{BuildInfo, BuildListener, LogListener, Transfer};

use crate::PublishArgs;
use crate::display::{self, ConsoleListener};

/// Services wired from settings.
pub struct App {
    store: Arc<ConfigurationStore>,
    tester: ConnectionTester,
    publisher: Publisher,
    capabilities: Capabilities,
}

impl App {
    /// Wires the services.
    pub fn new(settings: &Settings) -> Result<Self> {
        let hosts_path = settings.hosts_path()?;
        let store = Arc::new(
            ConfigurationStore::load(&hosts_path)
                .with_context(|| format!("Failed to load hosts from {}", hosts_path.display()))?,
        );

        let factory: Arc<dyn ClientFactory> =
            Arc::new(DropboxClientFactory::new(settings.client_options()));

        Ok(Self {
            tester: ConnectionTester::new(Arc::clone(&factory), settings.root_path()),
            publisher: Publisher::new(Arc::clone(&store), factory),
            capabilities: Capabilities::new(settings.host_version()?),
            store,
        })
    }

    /// Lists configured hosts.
    pub fn list_hosts(&self) -> Result<bool> {
        let hosts = self.store.host_configurations();
        if hosts.is_empty() {
            println!("No host configurations.");
            return Ok(true);
        }

        for host in hosts.iter() {
            display::host_summary(host);
        }
        Ok(true)
    }

    /// Shows one host.
    pub fn show_host(&self, name: &str) -> Result<bool> {
        let host = self
            .store
            .configuration(name)
            .ok_or_else(|| anyhow!("No host configuration named '{name}'"))?;
        display::host_details(&host);
        Ok(true)
    }

    /// Replaces every host configuration with the payload in `path`.
    pub fn configure_hosts(&self, path: &Path) -> Result<bool> {
        let payload = read_json(path)?;
        self.store.configure(&payload)?;

        let count = self.store.host_configurations().len();
        match self.store.path() {
            Some(saved_to) => println!(
                "{} Saved {count} host configuration(s) to {}",
                "✓".bright_green(),
                saved_to.display()
            ),
            None => println!("{} Saved {count} host configuration(s)", "✓".bright_green()),
        }
        Ok(true)
    }

    /// Tests a stored host or raw parameters.
    pub async fn test_connection(
        &self,
        params: Option<&Path>,
        name: Option<&str>,
        html: bool,
    ) -> Result<bool> {
        let result = match (params, name) {
            (Some(path), _) => {
                let params = read_json(path)?;
                self.tester.test_connection_params(&params).await
            }
            (None, Some(name)) => {
                let host = self
                    .store
                    .configuration(name)
                    .ok_or_else(|| anyhow!("No host configuration named '{name}'"))?;
                self.tester.test_connection(&host).await
            }
            (None, None) => return Err(anyhow!("Either --params or --name is required")),
        };

        if html {
            println!("{}", result.to_html());
        } else {
            display::validation(&result);
        }
        Ok(result.is_ok())
    }

    /// Prints capability answers.
    pub fn capabilities(&self, project_type: Option<&str>) -> Result<bool> {
        display::capabilities(&self.capabilities);
        if let Some(project_type) = project_type {
            display::field("Applicable", is_applicable(project_type));
        }
        Ok(true)
    }

    /// Publishes the files selected by `args`.
    pub async fn publish(&self, args: PublishArgs) -> Result<bool> {
        let base_dir = match args.base_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let transfer = Transfer::builder()
            .source_files(args.source)
            .excludes(args.exclude)
            .remove_prefix(args.remove_prefix)
            .remote_directory(args.remote_dir)
            .flatten(args.flatten)
            .build();

        let listener: Arc<dyn BuildListener> = if args.log_progress {
            Arc::new(LogListener)
        } else {
            Arc::new(ConsoleListener)
        };
        let build_info =
            BuildInfo::new(listener, base_dir).with_console_prefix(args.console_prefix);

        let report = self
            .publisher
            .publish(&args.host, &[transfer], &build_info)
            .await
            .with_context(|| format!("Publishing to '{}' failed", args.host))?;

        display::publish_report(&report);
        Ok(true)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        let settings = Settings {
            hosts_file: Some(dir.path().join("hosts.toml")),
            root_path: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        App::new(&settings).unwrap()
    }

    #[test]
    fn test_configure_and_show() {
        let dir = TempDir::new().unwrap();
        let payload = dir.path().join("payload.json");
        fs::write(
            &payload,
            r#"{"instance": [{"name": "prod", "token": "t", "remote_root_dir": "/builds"}]}"#,
        )
        .unwrap();

        let app = app(&dir);
        assert_eq!(
            app.store.path(),
            Some(dir.path().join("hosts.toml").as_path())
        );
        assert!(app.configure_hosts(&payload).unwrap());
        assert!(app.show_host("prod").unwrap());
        assert!(app.show_host("missing").is_err());

        // A fresh app reads what was saved
        let reloaded = self::app(&dir);
        assert_eq!(reloaded.store.host_configurations().len(), 1);
    }

    #[test]
    fn test_configure_rejects_bad_payload() {
        let dir = TempDir::new().unwrap();
        let payload = dir.path().join("payload.json");
        fs::write(&payload, r#"{"instance": {"token": "t"}}"#).unwrap();

        let app = app(&dir);
        assert!(app.configure_hosts(&payload).is_err());
        assert!(!dir.path().join("hosts.toml").exists());
    }

    #[tokio::test]
    async fn test_connection_binding_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let params = dir.path().join("params.json");
        fs::write(&params, r#"{"name": "adhoc"}"#).unwrap();

        let app = app(&dir);
        let ok = app
            .test_connection(Some(&params), None, false)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_connection_unknown_name() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        assert!(app.test_connection(None, Some("nope"), true).await.is_err());
    }
}
