//! Artifact transfer definitions.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// One set of files to publish.
///
/// Patterns are comma-separated globs relative to the build's base
/// directory, for example `target/*.jar, docs/**/*.html`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Transfer {
    /// Files to include.
    #[builder(setter(into))]
    pub source_files: String,

    /// Files to leave out, even if matched by `source_files`.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub excludes: String,

    /// Leading path removed from every matched file before upload.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub remove_prefix: String,

    /// Folder under the host's remote root to upload into.
    #[serde(default)]
    #[builder(default, setter(into))]
    pub remote_directory: String,

    /// Upload every file directly into `remote_directory`, dropping its
    /// relative directory.
    #[serde(default)]
    #[builder(default)]
    pub flatten: bool,
}

impl Transfer {
    /// Include patterns, trimmed, with empties dropped.
    #[must_use]
    pub fn source_patterns(&self) -> Vec<&str> {
        split_patterns(&self.source_files)
    }

    /// Exclude patterns, trimmed, with empties dropped.
    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<&str> {
        split_patterns(&self.excludes)
    }
}

fn split_patterns(patterns: &str) -> Vec<&str> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_patterns_split_and_trim() {
        let transfer = Transfer::builder()
            .source_files(" target/*.jar ,, docs/**/*.html")
            .build();
        assert_eq!(transfer.source_patterns(), vec!["target/*.jar", "docs/**/*.html"]);
        assert!(transfer.exclude_patterns().is_empty());
    }

    #[test]
    fn test_defaults_from_json() {
        let transfer: Transfer =
            serde_json::from_value(serde_json::json!({ "source_files": "*.zip" }))
                .unwrap_or_default();
        assert_eq!(transfer.source_files, "*.zip");
        assert!(!transfer.flatten);
        assert_eq!(transfer.remote_directory, "");
    }
}
