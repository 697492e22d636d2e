//! Entry listing and edits.

use std::io::Write;

use anyhow::Result;
use trackify_core::{Entry, EntryId, ProjectId, UserId, WorkspaceId};
use trackify_db::{Database, EntryPatch};

use super::util::{format_hours, parse_datetime};

/// Arguments accepted by `trackify edit`.
#[derive(Debug, Default)]
pub struct EditArgs {
    pub start: Option<String>,
    pub end: Option<String>,
    pub title: Option<String>,
    pub project: Option<String>,
    pub billable: Option<bool>,
}

pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &str,
    workspace: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workspace = WorkspaceId::new(workspace)?;
    let from = from.map(parse_datetime).transpose()?;
    let to = to.map(parse_datetime).transpose()?;

    let entries = db.list_entries(&user, &workspace, from, to)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No entries.")?;
        return Ok(());
    }
    for entry in &entries {
        write_entry_line(writer, entry)?;
    }
    Ok(())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "entry durations are far below 2^52 seconds"
)]
fn write_entry_line<W: Write>(writer: &mut W, entry: &Entry) -> Result<()> {
    let state = if entry.is_open() {
        "open".to_string()
    } else {
        format_hours(entry.duration_seconds as f64 / 3600.0)
    };
    writeln!(
        writer,
        "{}  {}  {}  [{}] {}",
        entry.id,
        entry.start_time.to_rfc3339(),
        state,
        entry.project_id,
        entry.title,
    )?;
    Ok(())
}

pub fn edit<W: Write>(
    writer: &mut W,
    db: &mut Database,
    entry: &str,
    args: &EditArgs,
) -> Result<()> {
    let entry_id = EntryId::new(entry)?;
    let patch = EntryPatch {
        start_time: args.start.as_deref().map(parse_datetime).transpose()?,
        end_time: args.end.as_deref().map(parse_datetime).transpose()?,
        title: args.title.clone(),
        project_id: args
            .project
            .as_deref()
            .map(ProjectId::new)
            .transpose()?,
        is_billable: args.billable,
    };

    let updated = db.edit_entry(&entry_id, &patch)?;
    writeln!(writer, "Updated entry {}", updated.id)?;
    write_entry_line(writer, &updated)?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, db: &mut Database, entry: &str) -> Result<()> {
    let entry_id = EntryId::new(entry)?;
    db.delete_entry(&entry_id)?;
    writeln!(writer, "Deleted entry {entry_id}")?;
    Ok(())
}
