//! User-facing label strings.

/// Name shown for the publisher.
pub const DISPLAY_NAME: &str = "Send build artifacts to Dropbox";

/// Shown when a connection test succeeds.
pub const TEST_CONNECTION_OK: &str = "Connection successful";

/// Shown above the diagnostic when a connection test fails.
pub const TEST_CONNECTION_ERROR: &str =
    "Cannot connect to Dropbox. Check the access token and the remote root directory.";

/// Labels for the fields of a host configuration, in display order.
pub const HOST_FIELD_LABELS: [(&str, &str); 4] = [
    ("name", "Name"),
    ("token", "Access token"),
    ("remote_root_dir", "Remote root directory"),
    ("timeout_ms", "Timeout (ms)"),
];

/// Looks up the display label for a host configuration field.
#[must_use]
pub fn host_field_label(field: &str) -> Option<&'static str> {
    HOST_FIELD_LABELS
        .iter()
        .find(|(key, _)| *key == field)
        .map(|(_, label)| *label)
}
