//! Applicability and host capability checks.
//!
//! Some behavior depends on which version of the host the publisher runs
//! under. [`Capabilities`] answers those questions against a fixed table of
//! features and the version each one first shipped in.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use dropbox_publisher_common::messages;

use crate::error::Error;

/// Project type the publisher must not be offered for.
pub const PROMOTION_JOB_TYPE: &str = "hudson.plugins.promoted_builds.PromotionProcess";

/// Node name used for the controller when none is configured.
pub const DEFAULT_MASTER_NODE_NAME: &str = "master";

/// Whether the publisher can be attached to a project of `project_type`.
///
/// Every type is accepted except promotion processes.
#[must_use]
pub fn is_applicable(project_type: &str) -> bool {
    project_type != PROMOTION_JOB_TYPE
}

/// Dotted numeric host version such as `1.414` or `2.440.1`.
///
/// Missing trailing components compare as zero, so `1.414` equals `1.414.0`.
#[derive(Debug, Clone)]
pub struct HostVersion(Vec<u32>);

impl HostVersion {
    /// Builds a version from its components.
    #[must_use]
    pub fn new(components: impl Into<Vec<u32>>) -> Self {
        Self(components.into())
    }

    fn component(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for HostVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Qualifiers such as "-SNAPSHOT" do not take part in comparisons
        let numeric = trimmed.split(['-', ' ']).next().unwrap_or_default();

        let components = numeric
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| Error::Config(format!("Invalid host version '{trimmed}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(components))
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl PartialEq for HostVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HostVersion {}

impl PartialOrd for HostVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HostVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// A host feature gated on the version it first shipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// The controller node has a configurable name.
    MasterHasNodeName,
    /// Descriptor selectors can be used to override defaults.
    SimpleDescriptorSelector,
}

impl Feature {
    /// Version components this feature first shipped in.
    #[must_use]
    pub const fn since(self) -> &'static [u32] {
        match self {
            Self::MasterHasNodeName => &[1, 414],
            Self::SimpleDescriptorSelector => &[1, 305],
        }
    }
}

/// Capability answers for one host version.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    host_version: Option<HostVersion>,
}

impl Capabilities {
    /// Capabilities for `host_version`. `None` means the version is unknown,
    /// in which case every feature is assumed available.
    #[must_use]
    pub const fn new(host_version: Option<HostVersion>) -> Self {
        Self { host_version }
    }

    /// The host version answers are based on.
    #[must_use]
    pub const fn host_version(&self) -> Option<&HostVersion> {
        self.host_version.as_ref()
    }

    /// Whether `feature` is available on this host.
    #[must_use]
    pub fn available(&self, feature: Feature) -> bool {
        self.host_version
            .as_ref()
            .is_none_or(|v| *v >= HostVersion::new(feature.since()))
    }

    /// Whether `feature` is missing on this host.
    #[must_use]
    pub fn missing(&self, feature: Feature) -> bool {
        !self.available(feature)
    }

    /// Whether the controller node name has to be set by the publisher,
    /// because the host cannot name it itself.
    #[must_use]
    pub fn can_set_master_node_name(&self) -> bool {
        self.missing(Feature::MasterHasNodeName)
    }

    /// Whether per-project overrides of the defaults can be offered.
    #[must_use]
    pub fn is_enable_override_defaults(&self) -> bool {
        self.available(Feature::SimpleDescriptorSelector)
    }

    /// Controller node name used when none is configured.
    #[must_use]
    pub const fn default_master_node_name(&self) -> &'static str {
        DEFAULT_MASTER_NODE_NAME
    }

    /// Name shown for the publisher.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        messages::DISPLAY_NAME
    }
}
