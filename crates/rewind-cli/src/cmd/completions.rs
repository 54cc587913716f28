use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};
use std::io::{self, Write};

/// Arguments for `rewind completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to emit a completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for the requested shell.
///
/// # Errors
///
/// Returns an error if stdout is closed before the script is flushed.
pub fn run_completions(args: &CompletionsArgs, command: &mut clap::Command) -> Result<()> {
    let mut out = io::stdout().lock();
    write_completions(args.shell, command, &mut out);
    out.flush().context("flushing completion script")
}

fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) {
    let bin = command.get_name().to_owned();
    generate(shell, command, bin, out);
}
