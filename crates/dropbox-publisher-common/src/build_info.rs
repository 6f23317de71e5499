//! Execution context handed to clients and publishers.
//!
//! [`BuildInfo`] carries what a client needs to know about the build it is
//! running for: where progress lines go, which directory artifacts are
//! resolved from, and when the build started.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Receives progress lines for a build.
pub trait BuildListener: Send + Sync {
    /// Writes one line of build output.
    fn log(&self, line: &str);
}

/// Listener that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullListener;

impl BuildListener for NullListener {
    fn log(&self, _line: &str) {}
}

/// Listener that forwards lines to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl BuildListener for LogListener {
    fn log(&self, line: &str) {
        log::info!("{line}");
    }
}

/// Context for one client session or publish run.
#[derive(Clone)]
pub struct BuildInfo {
    listener: Arc<dyn BuildListener>,
    console_prefix: String,
    base_directory: PathBuf,
    build_time: DateTime<Utc>,
}

impl fmt::Debug for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildInfo")
            .field("console_prefix", &self.console_prefix)
            .field("base_directory", &self.base_directory)
            .field("build_time", &self.build_time)
            .finish_non_exhaustive()
    }
}

impl BuildInfo {
    /// Creates a context rooted at `base_directory`.
    pub fn new(listener: Arc<dyn BuildListener>, base_directory: impl Into<PathBuf>) -> Self {
        Self {
            listener,
            console_prefix: String::new(),
            base_directory: base_directory.into(),
            build_time: Utc::now(),
        }
    }

    /// Minimal context with no real build behind it.
    ///
    /// Output is discarded and the base directory is `root`. Used for
    /// diagnostics such as connection tests.
    pub fn dummy(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(NullListener), root)
    }

    /// Sets the prefix prepended to every line written through [`Self::println`].
    #[must_use]
    pub fn with_console_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.console_prefix = prefix.into();
        self
    }

    /// Writes a line to the build listener.
    pub fn println(&self, message: &str) {
        if self.console_prefix.is_empty() {
            self.listener.log(message);
        } else {
            self.listener
                .log(&format!("{}{message}", self.console_prefix));
        }
    }

    /// Directory artifact patterns are resolved against.
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// When the build started.
    #[must_use]
    pub const fn build_time(&self) -> DateTime<Utc> {
        self.build_time
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl BuildListener for Recorder {
        fn log(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[test]
    fn test_println_applies_prefix() {
        let recorder = Arc::new(Recorder::default());
        let info = BuildInfo::new(recorder.clone(), "/work").with_console_prefix("[dropbox] ");

        info.println("uploading");
        info.println("done");

        let lines = recorder.0.lock().unwrap();
        assert_eq!(*lines, vec!["[dropbox] uploading", "[dropbox] done"]);
    }

    #[test]
    fn test_dummy_uses_root() {
        let info = BuildInfo::dummy("/var/lib/publisher");
        assert_eq!(info.base_directory(), Path::new("/var/lib/publisher"));
        info.println("discarded");
    }
}
