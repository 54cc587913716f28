//! Subcommands and the session-log loader they share.

pub mod activity;
pub mod completions;
pub mod diff;
pub mod history;
pub mod replay;

use anyhow::{Context, Result, bail};
use clap::Args;
use rewind_core::config::{EngineConfig, load_config, load_config_file};
use rewind_core::model::{Participant, Roster, ViewingTimestamp};
use rewind_core::record::InboundRecord;
use rewind_core::session::PumpStats;
use rewind_core::timeline::DocumentTimeline;
use rewind_core::{DocumentId, Session};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Arguments shared by every command that reads a session log.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// NDJSON session log.
    pub log: PathBuf,

    /// JSON array of participants used to resolve names.
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Config file to use instead of `.rewind/config.toml` discovery.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Counts from loading one log.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadReport {
    pub lines: usize,
    pub skipped: usize,
    #[serde(flatten)]
    pub routed: PumpStats,
}

/// Parse `latest`, an integer millisecond timestamp, or an RFC 3339 time.
pub fn parse_viewing(raw: &str) -> Result<ViewingTimestamp> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("latest") {
        return Ok(ViewingTimestamp::Latest);
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ViewingTimestamp::At(ms));
    }
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp '{raw}' (use latest, ms, or RFC 3339)"))?;
    Ok(ViewingTimestamp::At(parsed.timestamp_millis()))
}

fn resolve_config(args: &LogArgs, root: &Path) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => load_config_file(path),
        None => load_config(root),
    }
}

fn load_roster(path: &Path) -> Result<Roster> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let participants: Vec<Participant> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(participants.into_iter().collect())
}

/// Build a session from a log file. Undecodable lines are skipped with a
/// warning; every other record goes through the session inbox.
pub fn load_session(args: &LogArgs, root: &Path) -> Result<(Session, LoadReport)> {
    let config = resolve_config(args, root)?;
    let mut session = Session::new(&config, Box::new(rewind_core::buffer::ScratchBufferFactory));
    if let Some(path) = &args.roster {
        session = session.with_roster(load_roster(path)?);
    }

    let content = std::fs::read_to_string(&args.log)
        .with_context(|| format!("Failed to read {}", args.log.display()))?;

    let mut report = LoadReport::default();
    let sender = session.sender();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        report.lines += 1;
        match InboundRecord::from_json_line(line) {
            Ok(record) => {
                if !sender.send(record) {
                    bail!("session inbox closed while loading");
                }
            }
            Err(err) => {
                report.skipped += 1;
                warn!(code = %err.code(), line = index + 1, error = %err, "skipping record");
            }
        }
    }
    report.routed = session.pump();

    info!(
        log = %args.log.display(),
        lines = report.lines,
        skipped = report.skipped,
        documents = session.registry().len(),
        groups = session.groups().len(),
        "session loaded"
    );
    Ok((session, report))
}

/// Find a document by id, falling back to fuzzy title lookup.
pub fn find_document<'a>(session: &'a Session, query: &str) -> Result<&'a DocumentTimeline> {
    let registry = session.registry();
    registry
        .get_document(&DocumentId::new(query))
        .or_else(|| registry.fuzzy_find_by_title(query))
        .with_context(|| {
            format!(
                "{}: no document matches '{query}'",
                rewind_core::ErrorCode::UnknownDocument
            )
        })
}
