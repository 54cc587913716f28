use anyhow::Result;
use clap::Args;
use rewind_core::activity::{ActivityGroup, ActivityItem, DocumentDiff, GroupEvent, GroupKind};
use rewind_core::model::ParticipantRef;
use rewind_core::Session;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::{LogArgs, load_session};
use crate::output::{self, OutputMode};

/// Arguments for `rewind activity`.
#[derive(Args, Debug)]
pub struct ActivityArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Include per-document diffs for edit groups.
    #[arg(long)]
    pub diffs: bool,

    /// Also print the group events emitted while loading.
    #[arg(long)]
    pub events: bool,
}

#[derive(Debug, Serialize)]
struct GroupView {
    id: String,
    kind: GroupKind,
    start: i64,
    end: i64,
    items: usize,
    summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diffs: Vec<DocumentDiff>,
}

#[derive(Debug, Serialize)]
struct ActivityOutput {
    groups: Vec<GroupView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<GroupEvent>,
}

fn names(refs: &[&ParticipantRef]) -> String {
    refs.iter()
        .map(|r| r.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn summarize(group: &ActivityGroup) -> String {
    match group.kind() {
        GroupKind::Text => group
            .sender()
            .map_or_else(String::new, |s| s.display_name().to_string()),
        GroupKind::Presence => {
            let verb = if group.is_connect() == Some(true) {
                "joined"
            } else {
                "left"
            };
            format!("{} {verb}", names(&group.participants()))
        }
        GroupKind::Edit => {
            let documents: Vec<_> = group.documents().iter().map(|d| d.as_str()).collect();
            format!("{} edited {}", names(&group.authors()), documents.join(", "))
        }
    }
}

fn view(session: &Session, group: &ActivityGroup, with_diffs: bool) -> GroupView {
    let messages = group
        .items()
        .iter()
        .filter_map(|item| match item {
            ActivityItem::Text(m) => Some(m.body.clone()),
            ActivityItem::Presence(_) | ActivityItem::Edit(_) => None,
        })
        .collect();
    let diffs = if with_diffs && group.kind() == GroupKind::Edit {
        session.diff_summary(group.id()).unwrap_or_default()
    } else {
        Vec::new()
    };
    GroupView {
        id: group.id().to_string(),
        kind: group.kind(),
        start: group.earliest(),
        end: group.latest(),
        items: group.len(),
        summary: summarize(group),
        messages,
        diffs,
    }
}

/// Print the grouped activity feed of a log.
///
/// # Errors
///
/// Fails if the log cannot be loaded.
pub fn run_activity(args: &ActivityArgs, output: OutputMode, root: &Path) -> Result<()> {
    let (mut session, _) = load_session(&args.log, root)?;
    let events = if args.events {
        session.groups_mut().drain_events()
    } else {
        Vec::new()
    };
    let groups = session
        .groups()
        .groups()
        .iter()
        .map(|g| view(&session, g, args.diffs))
        .collect();

    let result = ActivityOutput { groups, events };
    output::render(output, &result, |r, w| render_human(r, w))
}

fn render_human(result: &ActivityOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if result.groups.is_empty() {
        writeln!(w, "no activity")?;
    }
    for group in &result.groups {
        writeln!(
            w,
            "{:<4} {:<8} {}  {}",
            group.id,
            group.kind.as_str(),
            output::format_timestamp(group.start),
            group.summary
        )?;
        for message in &group.messages {
            writeln!(w, "       > {message}")?;
        }
        for diff in &group.diffs {
            if !diff.diff.is_empty() {
                writeln!(w, "{}", diff.diff)?;
            }
        }
    }
    if !result.events.is_empty() {
        writeln!(w)?;
        output::section(w, "events")?;
        for event in &result.events {
            writeln!(w, "{}", event.name())?;
        }
    }
    Ok(())
}
