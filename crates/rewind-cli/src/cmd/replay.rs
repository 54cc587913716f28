use anyhow::Result;
use clap::Args;
use rewind_core::model::ViewingTimestamp;
use rewind_core::timeline::DocumentTimeline;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::{LoadReport, LogArgs, find_document, load_session, parse_viewing};
use crate::output::{self, OutputMode};

/// Arguments for `rewind replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Moment to materialize: `latest`, milliseconds, or RFC 3339.
    #[arg(long, default_value = "latest")]
    pub at: String,

    /// Only print this document (id or title).
    #[arg(long)]
    pub document: Option<String>,

    /// Include documents that are closed at the viewing timestamp.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct DocumentView {
    id: String,
    title: String,
    grammar: Option<String>,
    open: bool,
    modified: bool,
    deltas: usize,
    applied: usize,
    text: String,
}

impl DocumentView {
    fn of(timeline: &DocumentTimeline) -> Self {
        Self {
            id: timeline.id().to_string(),
            title: timeline.title().to_string(),
            grammar: timeline.grammar().map(ToOwned::to_owned),
            open: timeline.is_open(),
            modified: timeline.is_modified(),
            deltas: timeline.len(),
            applied: timeline.replay_pointer().map_or(0, |p| p + 1),
            text: timeline.text(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    viewing: ViewingTimestamp,
    load: LoadReport,
    documents: Vec<DocumentView>,
}

/// Materialize documents at a moment in the log.
///
/// # Errors
///
/// Fails if the log cannot be loaded, the timestamp does not parse, or the
/// requested document does not exist.
pub fn run_replay(args: &ReplayArgs, output: OutputMode, root: &Path) -> Result<()> {
    let requested = parse_viewing(&args.at)?;
    let (mut session, load) = load_session(&args.log, root)?;
    let viewing = session
        .registry_mut()
        .set_global_viewing_timestamp(requested);

    let documents: Vec<DocumentView> = match &args.document {
        Some(query) => vec![DocumentView::of(find_document(&session, query)?)],
        None => session
            .registry()
            .documents()
            .filter(|d| args.all || d.is_open())
            .map(DocumentView::of)
            .collect(),
    };

    let result = ReplayOutput {
        viewing,
        load,
        documents,
    };
    output::render(output, &result, |r, w| render_human(r, w))
}

fn render_human(result: &ReplayOutput, w: &mut dyn Write) -> std::io::Result<()> {
    output::kv(w, "viewing", output::format_viewing(result.viewing))?;
    if result.load.skipped > 0 {
        output::kv(w, "skipped", format!("{} of {} lines", result.load.skipped, result.load.lines))?;
    }
    if result.documents.is_empty() {
        writeln!(w, "no open documents")?;
        return Ok(());
    }
    for doc in &result.documents {
        writeln!(w)?;
        output::section(w, &format!("{} ({})", doc.title, doc.id))?;
        if !doc.open {
            writeln!(w, "[closed]")?;
        }
        writeln!(w, "{}", doc.text)?;
    }
    Ok(())
}
