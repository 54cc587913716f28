use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::{LogArgs, find_document, load_session, parse_viewing};
use crate::output::{self, OutputMode};

/// Arguments for `rewind history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Document id or title.
    pub document: String,

    /// Mark which deltas are applied at this moment.
    #[arg(long, default_value = "latest")]
    pub at: String,
}

#[derive(Debug, Serialize)]
struct HistoryRow {
    id: String,
    timestamp: i64,
    kind: &'static str,
    author: Option<String>,
    applied: bool,
}

#[derive(Debug, Serialize)]
struct HistoryOutput {
    document: String,
    title: String,
    deltas: Vec<HistoryRow>,
}

/// List a document's deltas in timestamp order.
///
/// # Errors
///
/// Fails if the log cannot be loaded or the document does not exist.
pub fn run_history(args: &HistoryArgs, output: OutputMode, root: &Path) -> Result<()> {
    let viewing = parse_viewing(&args.at)?;
    let (mut session, _) = load_session(&args.log, root)?;
    session.registry_mut().set_global_viewing_timestamp(viewing);

    let timeline = find_document(&session, &args.document)?;
    let applied = timeline.replay_pointer().map_or(0, |p| p + 1);
    let deltas = timeline
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| HistoryRow {
            id: entry.id.to_string(),
            timestamp: entry.delta.timestamp,
            kind: entry.delta.kind().as_str(),
            author: entry.delta.author.as_ref().map(ToString::to_string),
            applied: index < applied,
        })
        .collect();

    let result = HistoryOutput {
        document: timeline.id().to_string(),
        title: timeline.title().to_string(),
        deltas,
    };
    output::render(output, &result, |r, w| render_human(r, w))
}

fn render_human(result: &HistoryOutput, w: &mut dyn Write) -> std::io::Result<()> {
    output::section(w, &format!("{} ({})", result.title, result.document))?;
    for row in &result.deltas {
        writeln!(
            w,
            "{} {:<6} {:<24} {:<9} {}",
            if row.applied { '*' } else { ' ' },
            row.id,
            output::format_timestamp(row.timestamp),
            row.kind,
            row.author.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}
