//! # dropbox-publisher
//!
//! Services for publishing build artifacts to Dropbox.
//!
//! - [`ConfigurationStore`]: the persisted, ordered list of named host
//!   configurations
//! - [`ConnectionTester`]: diagnostic connect/disconnect against one host
//! - [`Capabilities`] and [`is_applicable`]: host-version and project-type
//!   queries
//! - [`Publisher`]: uploads the files matched by a set of transfers
//!
//! Services are plain values wired together by the caller:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dropbox_publisher::{ConfigurationStore, ConnectionTester, Settings};
//! use dropbox_publisher_client::DropboxClientFactory;
//!
//! # async fn example() -> dropbox_publisher::Result<()> {
//! let settings = Settings::load()?;
//! let store = ConfigurationStore::load(settings.hosts_path()?)?;
//! let factory = Arc::new(DropboxClientFactory::new(settings.client_options()));
//! let tester = ConnectionTester::new(factory, settings.root_path());
//!
//! if let Some(host) = store.configuration("prod") {
//!     println!("{}", tester.test_connection(&host).await);
//! }
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod error;
pub mod paths;
pub mod publisher;
pub mod settings;
pub mod store;
pub mod tester;

pub use capabilities::{Capabilities, Feature, HostVersion, PROMOTION_JOB_TYPE, is_applicable};
pub use error::{Error, Result};
pub use publisher::{PlannedUpload, PublishReport, Publisher, plan_transfer};
pub use settings::Settings;
pub use store::ConfigurationStore;
pub use tester::ConnectionTester;
