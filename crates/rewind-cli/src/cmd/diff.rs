use anyhow::{Context, Result, bail};
use clap::Args;
use rewind_core::activity::unified_diff;
use rewind_core::ErrorCode;
use rewind_core::model::{DeltaId, ViewingTimestamp};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::{LogArgs, find_document, load_session, parse_viewing};
use crate::output::{self, OutputMode};

/// Arguments for `rewind diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Document id or title.
    pub document: String,

    /// Diff the text around one delta (`d3` or `3`).
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub delta: Option<String>,

    /// Start of the span: `latest`, milliseconds, or RFC 3339.
    #[arg(long)]
    pub from: Option<String>,

    /// End of the span.
    #[arg(long, default_value = "latest")]
    pub to: String,
}

#[derive(Debug, Serialize)]
struct DiffOutput {
    document: String,
    title: String,
    before: String,
    after: String,
    diff: String,
}

/// Unified diff of a document across one delta or a time span.
///
/// # Errors
///
/// Fails if the log cannot be loaded, the document or delta does not exist,
/// or neither `--delta` nor `--from` is given.
pub fn run_diff(args: &DiffArgs, output: OutputMode, root: &Path) -> Result<()> {
    let (mut session, _) = load_session(&args.log, root)?;
    let context = session.diff_context();
    let id = find_document(&session, &args.document)?.id().clone();

    let (before, after) = if let Some(raw) = &args.delta {
        let delta: DeltaId = raw.parse()?;
        let timeline = find_document(&session, id.as_str())?;
        let before = timeline
            .text_before_delta(delta)
            .with_context(|| format!("{}: no delta {delta} in {id}", ErrorCode::UnknownDelta))?;
        let after = timeline
            .text_after_delta(delta)
            .with_context(|| format!("{}: no delta {delta} in {id}", ErrorCode::UnknownDelta))?;
        (before, after)
    } else if let Some(from) = &args.from {
        let from = parse_viewing(from)?;
        let to = parse_viewing(&args.to)?;
        (text_at(&mut session, &id, from)?, text_at(&mut session, &id, to)?)
    } else {
        bail!("pass --delta or --from");
    };

    let title = find_document(&session, id.as_str())?.title().to_string();
    let result = DiffOutput {
        document: id.to_string(),
        diff: unified_diff(&title, &before, &after, context),
        title,
        before,
        after,
    };
    output::render(output, &result, |r, w| {
        if r.diff.is_empty() {
            writeln!(w, "no changes")
        } else {
            writeln!(w, "{}", r.diff)
        }
    })
}

fn text_at(
    session: &mut rewind_core::Session,
    id: &rewind_core::DocumentId,
    viewing: ViewingTimestamp,
) -> Result<String> {
    let registry = session.registry_mut();
    registry.set_global_viewing_timestamp(viewing);
    registry
        .get_document(id)
        .map(rewind_core::DocumentTimeline::text)
        .with_context(|| format!("no document {id}"))
}
