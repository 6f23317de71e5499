//! # dropbox-publisher-common
//!
//! Common types for publishing build artifacts to Dropbox.
//!
//! This crate provides the data model shared by the client and the services:
//! - Named host configurations and remote path helpers
//! - Validation outcomes for diagnostic actions
//! - The build execution context and its output listener
//! - Transfer definitions and user-facing labels
//!
//! ## Example
//!
//! ```
//! use dropbox_publisher_common::{BuildInfo, HostConfiguration, ValidationResult};
//!
//! let host = HostConfiguration::builder()
//!     .name("nightly")
//!     .token("sl.token")
//!     .build();
//!
//! let info = BuildInfo::dummy("/tmp");
//! info.println("discarded");
//!
//! let result = ValidationResult::error("Cannot connect").with_detail("TimeoutError: timed out");
//! assert!(result.to_html().contains("<pre>"));
//! # let _ = host;
//! ```

/// Execution context and build output listeners.
pub mod build_info;
/// Host configuration records.
pub mod host;
pub mod messages;
/// Artifact transfer definitions.
pub mod transfer;
/// Validation outcomes and HTML escaping.
pub mod validation;

pub use build_info::{BuildInfo, BuildListener, LogListener, NullListener};
pub use host::{DEFAULT_TIMEOUT_MS, HostConfiguration, join_remote_path, normalize_remote_path};
pub use transfer::Transfer;
pub use validation::{ValidationKind, ValidationResult};
