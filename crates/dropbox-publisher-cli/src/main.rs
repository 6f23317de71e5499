//! Dropbox Publisher CLI
//!
//! Manages named Dropbox host configurations, tests connectivity, answers
//! capability queries, and publishes build artifacts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use colored::Colorize;

use dropbox_publisher::Settings;

mod commands;
mod display;

#[derive(Parser, Debug)]
#[command(name = "dropbox-publisher", author, version, about, long_about = None)]
struct Cli {
    /// Settings file (default: ~/.config/dropbox-publisher/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hosts file, overriding the one in the settings
    #[arg(long, global = true)]
    hosts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage host configurations
    #[command(subcommand)]
    Hosts(HostsCommand),

    /// Test the connection to a host
    Test(TestArgs),

    /// Show host capabilities and applicability
    Capabilities {
        /// Project type to check applicability for
        #[arg(long)]
        project_type: Option<String>,
    },

    /// Publish build artifacts to a host
    Publish(PublishArgs),
}

#[derive(Subcommand, Debug)]
enum HostsCommand {
    /// List configured hosts
    List,

    /// Show one host configuration
    Show {
        /// Host configuration name
        name: String,
    },

    /// Replace all host configurations with a JSON payload
    ///
    /// The payload's "instance" key holds one configuration object or an
    /// array of them.
    Configure {
        /// Path to the JSON payload
        payload: PathBuf,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["params", "name"])))]
struct TestArgs {
    /// JSON file with raw connection parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Name of a stored host configuration
    #[arg(long)]
    name: Option<String>,

    /// Print the result as an HTML fragment
    #[arg(long)]
    html: bool,
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Host configuration to publish to
    #[arg(long)]
    host: String,

    /// Comma-separated globs of files to upload
    #[arg(long)]
    source: String,

    /// Comma-separated globs of files to leave out
    #[arg(long, default_value = "")]
    exclude: String,

    /// Leading path to remove from matched files
    #[arg(long, default_value = "")]
    remove_prefix: String,

    /// Folder under the host's remote root to upload into
    #[arg(long, default_value = "")]
    remote_dir: String,

    /// Upload every file into the remote folder, dropping subdirectories
    #[arg(long)]
    flatten: bool,

    /// Directory the globs are relative to (default: current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Send progress lines to the log instead of stdout
    #[arg(long)]
    log_progress: bool,

    /// Text prepended to every progress line
    #[arg(long, default_value = "")]
    console_prefix: String,
}

/// Initializes structured logging with tracing.
///
/// Supports two output formats via the `DROPBOX_PUBLISHER_LOG_FORMAT`
/// environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via the `RUST_LOG` environment variable.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("DROPBOX_PUBLISHER_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("dropbox_publisher=info,dropbox_publisher_client=warn")
    });

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };

    if let Some(hosts_file) = &cli.hosts_file {
        settings.hosts_file = Some(hosts_file.clone());
    }

    Ok(settings)
}

async fn run(cli: Cli) -> Result<bool> {
    let settings = load_settings(&cli)?;
    let app = commands::App::new(&settings)?;

    match cli.command {
        Command::Hosts(HostsCommand::List) => app.list_hosts(),
        Command::Hosts(HostsCommand::Show { name }) => app.show_host(&name),
        Command::Hosts(HostsCommand::Configure { payload }) => app.configure_hosts(&payload),
        Command::Test(args) => {
            app.test_connection(args.params.as_deref(), args.name.as_deref(), args.html)
                .await
        }
        Command::Capabilities { project_type } => app.capabilities(project_type.as_deref()),
        Command::Publish(args) => app.publish(args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".bright_red());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_test_requires_one_target() {
        assert!(Cli::try_parse_from(["dropbox-publisher", "test"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dropbox-publisher",
                "test",
                "--name",
                "prod",
                "--params",
                "p.json"
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["dropbox-publisher", "test", "--name", "prod"]).is_ok());
    }

    #[test]
    fn test_publish_defaults() {
        let cli = Cli::try_parse_from([
            "dropbox-publisher",
            "publish",
            "--host",
            "prod",
            "--source",
            "target/*.jar",
        ])
        .map_err(|e| e.to_string());

        let Ok(Cli {
            command: Command::Publish(args),
            ..
        }) = cli
        else {
            unreachable!("publish should parse");
        };
        assert_eq!(args.host, "prod");
        assert!(args.exclude.is_empty());
        assert!(!args.flatten);
        assert!(args.base_dir.is_none());
        assert!(args.console_prefix.is_empty());
    }
}
