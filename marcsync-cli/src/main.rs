//! marcsync CLI - Command-line interface
//!
//! Cron entry point for the marcsync library: fetch new MARC exports,
//! archive them, and prune the cumulative store.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use marcsync::logging;
use marcsync::{LogNotifier, RunContext};
use tracing::error;

use crate::commands::run::RunArgs;
use crate::error::CliError;

/// Default sender shown in notifications.
const DEFAULT_SENDER: &str = "marcsync@localhost";

#[derive(Debug, Parser)]
#[command(name = "marcsync", version, about = "Incremental download and retention of dated MARC export files")]
struct Cli {
    /// Configuration file (default: <config dir>/marcsync/marcsync.conf)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append log output to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch new exports, archive them and clean up the cumulative store
    Run(RunCommand),
    /// Apply the retention policy to the cumulative store only
    Cleanup,
    /// Show the store location and the cutoffs the next run would use
    Status,
}

#[derive(Debug, Args)]
struct RunCommand {
    /// Recipient of the run notification
    #[arg(long)]
    recipient: Option<String>,

    /// Sender shown in the run notification
    #[arg(long, default_value = DEFAULT_SENDER)]
    sender: String,

    /// Directory new downloads are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    download_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_setup = logging::init(cli.verbose, cli.log_file.as_deref()).map_err(CliError::from);
    let _log_guard = match log_setup {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let context = run_context(&cli.command);

    match dispatch(cli, &context) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "marcsync failed");
            if let Err(notify_error) = context.report_failure(&e) {
                eprintln!("Error: {}", notify_error);
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_context(command: &Commands) -> RunContext {
    match command {
        Commands::Run(args) => RunContext::new(args.sender.clone(), Box::new(LogNotifier))
            .with_recipient(args.recipient.clone()),
        _ => RunContext::new(DEFAULT_SENDER, Box::new(LogNotifier)),
    }
}

fn dispatch(cli: Cli, context: &RunContext) -> Result<(), CliError> {
    match cli.command {
        Commands::Run(args) => commands::run::run(
            RunArgs {
                config: cli.config,
                download_dir: args.download_dir,
            },
            context,
        ),
        Commands::Cleanup => commands::cleanup::run(cli.config),
        Commands::Status => commands::status::run(cli.config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "marcsync",
            "--config",
            "/etc/marcsync.conf",
            "run",
            "--recipient",
            "ops@example.org",
            "--download-dir",
            "/tmp/marc",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/marcsync.conf")));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.recipient.as_deref(), Some("ops@example.org"));
                assert_eq!(args.download_dir, PathBuf::from("/tmp/marc"));
                assert_eq!(args.sender, DEFAULT_SENDER);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["marcsync", "status", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_log_file_without_name_is_logging_error() {
        let result = logging::init(false, Some(std::path::Path::new("/"))).map_err(CliError::from);
        assert!(matches!(result, Err(CliError::Logging(_))));
    }

    #[test]
    fn test_run_context_recipient() {
        let cli = Cli::try_parse_from(["marcsync", "run", "--recipient", "a@b.c"]).unwrap();
        let context = run_context(&cli.command);
        assert_eq!(context.recipient.as_deref(), Some("a@b.c"));

        let cli = Cli::try_parse_from(["marcsync", "cleanup"]).unwrap();
        assert_eq!(run_context(&cli.command).recipient, None);
    }
}
