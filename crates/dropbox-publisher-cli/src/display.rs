//! Display utilities for CLI output formatting

use std::fmt::Display;

use colored::Colorize;

use dropbox_publisher::{Capabilities, PublishReport};
use dropbox_publisher_common::messages::host_field_label;
use dropbox_publisher_common::{BuildListener, HostConfiguration, ValidationKind, ValidationResult};

/// Build listener that prints progress lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleListener;

impl BuildListener for ConsoleListener {
    fn log(&self, line: &str) {
        println!("{} {line}", "→".bright_blue());
    }
}

/// Print a labelled value
pub fn field(label: &str, value: impl Display) {
    println!("  {:<28} {value}", format!("{label}:"));
}

fn labelled(field_name: &str, value: impl Display) {
    field(host_field_label(field_name).unwrap_or(field_name), value);
}

/// One line per host
pub fn host_summary(host: &HostConfiguration) {
    let root = if host.remote_root_dir.is_empty() {
        "/".to_string()
    } else {
        host.remote_root_path()
    };
    println!(
        "{}  {}  {}ms",
        host.name.bright_cyan(),
        root,
        host.timeout_ms
    );
}

/// Full host details, token masked
pub fn host_details(host: &HostConfiguration) {
    println!("{}", host.name.bright_cyan().bold());
    labelled("name", &host.name);
    labelled("token", "********");
    labelled("remote_root_dir", &host.remote_root_dir);
    labelled("timeout_ms", host.timeout_ms);
}

/// Display a connection test outcome
pub fn validation(result: &ValidationResult) {
    let marker = match result.kind {
        ValidationKind::Ok => "✓".bright_green(),
        ValidationKind::Warning => "!".bright_yellow(),
        ValidationKind::Error => "✗".bright_red(),
    };
    println!("{marker} {}", result.summary);
    if let Some(detail) = &result.detail {
        for line in detail.lines() {
            println!("  {}", line.dimmed());
        }
    }
}

pub fn capabilities(capabilities: &Capabilities) {
    println!("{}", capabilities.display_name().bold());
    let version = capabilities
        .host_version()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);
    field("Host version", version);
    field(
        "Can set master node name",
        capabilities.can_set_master_node_name(),
    );
    field(
        "Override defaults enabled",
        capabilities.is_enable_override_defaults(),
    );
    field(
        "Default master node name",
        capabilities.default_master_node_name(),
    );
}

pub fn publish_report(report: &PublishReport) {
    println!(
        "{} Published {} file(s), {} bytes, to {}",
        "✓".bright_green(),
        report.file_count(),
        report.bytes,
        report.host.bright_cyan()
    );
    field(
        "Build started",
        report.build_time.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}
