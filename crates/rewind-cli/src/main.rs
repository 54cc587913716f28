#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "rewind",
    author,
    version,
    about = "rewind: time-travel through recorded editing sessions",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Documents",
        about = "Materialize documents at a moment",
        long_about = "Replay a session log and print every open document as it was at the given moment.",
        after_help = "EXAMPLES:\n    # Current state of every open document\n    rewind replay session.ndjson\n\n    # One document, one minute into the session\n    rewind replay session.ndjson --document main.rs --at 60000\n\n    # Emit machine-readable output\n    rewind replay session.ndjson --json"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        next_help_heading = "Documents",
        about = "List a document's deltas",
        long_about = "List a document's deltas in timestamp order, marking those applied at --at.",
        after_help = "EXAMPLES:\n    # Full history\n    rewind history session.ndjson main.rs\n\n    # Which deltas are applied at a moment\n    rewind history session.ndjson main.rs --at 2024-05-01T10:00:00Z"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Diff a document across a delta or time span",
        after_help = "EXAMPLES:\n    # What one delta changed\n    rewind diff session.ndjson main.rs --delta d3\n\n    # Everything since a moment\n    rewind diff session.ndjson main.rs --from 60000"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "Activity",
        about = "Show the grouped activity feed",
        after_help = "EXAMPLES:\n    # Feed with edit diffs\n    rewind activity session.ndjson --diffs\n\n    # Include the group events\n    rewind activity session.ndjson --events --json"
    )]
    Activity(cmd::activity::ActivityArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    rewind completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("REWIND_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "rewind=debug,info"
        } else {
            "rewind=info,warn"
        })
    });

    let format = env::var("REWIND_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = env::current_dir()?;
    let output = cli.output_mode();
    debug!(root = %root.display(), json = cli.json, "starting");

    let result = match cli.command {
        Commands::Replay(ref args) => cmd::replay::run_replay(args, output, &root),
        Commands::History(ref args) => cmd::history::run_history(args, output, &root),
        Commands::Diff(ref args) => cmd::diff::run_diff(args, output, &root),
        Commands::Activity(ref args) => cmd::activity::run_activity(args, output, &root),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }
    };

    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "command failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["rewind", "replay", "log.ndjson", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn default_output_is_human() {
        let cli = Cli::parse_from(["rewind", "activity", "log.ndjson"]);
        assert!(!cli.output_mode().is_json());
    }

    #[test]
    fn replay_defaults_to_latest() {
        let cli = Cli::parse_from(["rewind", "replay", "log.ndjson"]);
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.at, "latest");
        assert!(args.document.is_none());
    }

    #[test]
    fn diff_delta_conflicts_with_span() {
        let result = Cli::try_parse_from([
            "rewind", "diff", "log.ndjson", "doc", "--delta", "d1", "--from", "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["rewind", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["rewind", "replay", "l"],
            vec!["rewind", "history", "l", "doc"],
            vec!["rewind", "diff", "l", "doc", "--delta", "d0"],
            vec!["rewind", "activity", "l", "--diffs"],
            vec!["rewind", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter().copied());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn command_is_named_after_binary() {
        assert_eq!(Cli::command().get_name(), "rewind");
    }

    #[test]
    fn command_factory_is_consistent() {
        Cli::command().debug_assert();
    }
}
