//! Validation outcomes for diagnostic actions.
//!
//! A [`ValidationResult`] reports the outcome of a one-shot check such as a
//! connection test. It can be rendered as plain text for terminals or as an
//! HTML fragment whose text is escaped for safe embedding.

use std::fmt;

use serde::Serialize;

/// Severity of a validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// The check passed.
    Ok,
    /// The check passed with a caveat.
    Warning,
    /// The check failed.
    Error,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of a validation with a human-readable message.
///
/// `summary` is the fixed, user-facing sentence. `detail` carries diagnostic
/// text such as the error kind and message that caused a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Severity.
    pub kind: ValidationKind,
    /// Fixed user-facing message.
    pub summary: String,
    /// Optional diagnostic detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationResult {
    /// A passing outcome.
    pub fn ok(summary: impl Into<String>) -> Self {
        Self::new(ValidationKind::Ok, summary)
    }

    /// A passing outcome with a caveat.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(ValidationKind::Warning, summary)
    }

    /// A failing outcome.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(ValidationKind::Error, summary)
    }

    fn new(kind: ValidationKind, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            detail: None,
        }
    }

    /// Attaches diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether this outcome is [`ValidationKind::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.kind, ValidationKind::Ok)
    }

    /// Plain-text message: the summary, followed by the detail if present.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}\n{detail}", self.summary),
            None => self.summary.clone(),
        }
    }

    /// Renders the outcome as an HTML fragment.
    ///
    /// All text is escaped. Detail, when present, is placed in a `<pre>`
    /// block below the summary paragraph.
    #[must_use]
    pub fn to_html(&self) -> String {
        match &self.detail {
            Some(detail) => format!(
                "<p>{}</p><p><pre>{}</pre></p>",
                escape(&self.summary),
                escape(detail)
            ),
            None => escape(&self.summary),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message())
    }
}

/// Escapes text for embedding in HTML.
///
/// Newlines become `<br>` so multi-line diagnostics keep their shape.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(ch),
        }
    }
    out
}
