//! Host configuration records.
//!
//! A [`HostConfiguration`] names one Dropbox destination: the access token
//! used to authenticate, the folder all transfers are rooted in, and the
//! request timeout. Records are persisted by the service crate and bound
//! from submitted payloads, so the type round-trips through both JSON and
//! TOML.
//!
//! ## Example
//!
//! ```
//! use dropbox_publisher_common::HostConfiguration;
//!
//! let host = HostConfiguration::builder()
//!     .name("prod")
//!     .token("sl.example-token")
//!     .remote_root_dir("/builds")
//!     .build();
//!
//! assert_eq!(host.remote_root_path(), "/builds");
//! assert_eq!(host.timeout_ms, 300_000);
//! ```

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

/// Default request timeout for a host, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Connection parameters for one Dropbox destination.
///
/// `name` is the lookup key. Uniqueness is not enforced here; see
/// the configuration store for how duplicates resolve.
///
/// # Security
///
/// The token is held in a [`SecretString`] and is redacted from `Debug`
/// output. It is only exposed when serializing for persistence and when
/// building the `Authorization` header.
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
pub struct HostConfiguration {
    /// Unique (by convention) name of this destination.
    #[builder(setter(into))]
    pub name: String,

    /// OAuth2 bearer token for the Dropbox account.
    #[serde(serialize_with = "serialize_token")]
    #[builder(setter(transform = |token: impl Into<String>| SecretString::from(token.into())))]
    pub token: SecretString,

    /// Folder every transfer is placed under. Empty means the account root.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub remote_root_dir: String,

    /// Request timeout in milliseconds. Zero means the default.
    #[serde(
        default = "default_timeout_ms",
        deserialize_with = "deserialize_timeout"
    )]
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

impl HostConfiguration {
    /// Binds a record from raw request parameters.
    ///
    /// Parameters arrive as a flat JSON object. Numeric fields may be given
    /// either as numbers or as strings, since form parameters are untyped.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or a field has the
    /// wrong shape.
    pub fn from_params(params: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(params)
    }

    /// The configured timeout as a [`Duration`].
    ///
    /// A zero `timeout_ms` falls back to [`DEFAULT_TIMEOUT_MS`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// The remote root in the form the Dropbox API expects.
    ///
    /// The account root is the empty string; every other folder starts with
    /// a single `/` and has no trailing slash.
    #[must_use]
    pub fn remote_root_path(&self) -> String {
        normalize_remote_path(&self.remote_root_dir)
    }

    /// Exposes the token for building request headers.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for HostConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfiguration")
            .field("name", &self.name)
            .field("token", &"[REDACTED]")
            .field("remote_root_dir", &self.remote_root_dir)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl PartialEq for HostConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.token.expose_secret() == other.token.expose_secret()
            && self.remote_root_dir == other.remote_root_dir
            && self.timeout_ms == other.timeout_ms
    }
}

impl Eq for HostConfiguration {}

/// Normalizes a remote path to Dropbox API form.
///
/// Backslashes become forward slashes, repeated separators collapse, and the
/// result either is empty (the root) or starts with `/` without a trailing `/`.
#[must_use]
pub fn normalize_remote_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Joins remote path segments, normalizing the result.
#[must_use]
pub fn join_remote_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let joined = parts.into_iter().collect::<Vec<_>>().join("/");
    normalize_remote_path(&joined)
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn serialize_token<S>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(token.expose_secret())
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timeout {
        Number(u64),
        Text(String),
    }

    let ms = match Timeout::deserialize(deserializer)? {
        Timeout::Number(ms) => ms,
        Timeout::Text(text) if text.trim().is_empty() => DEFAULT_TIMEOUT_MS,
        Timeout::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid timeout '{text}': {e}")))?,
    };

    Ok(if ms == 0 { DEFAULT_TIMEOUT_MS } else { ms })
}
