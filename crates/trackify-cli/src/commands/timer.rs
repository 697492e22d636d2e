//! Timer start/stop commands.

use std::io::Write;

use anyhow::Result;
use trackify_core::{ProjectId, UserId, WorkspaceId};
use trackify_db::Database;

use super::util::format_hours;

pub fn start<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &str,
    workspace: &str,
    project: &str,
    title: &str,
    billable: bool,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workspace = WorkspaceId::new(workspace)?;
    let project = ProjectId::new(project)?;

    let entry = db.start_timer(&user, &workspace, &project, title, billable)?;
    writeln!(writer, "Started timer for {user} in {workspace}")?;
    writeln!(writer, "Entry: {} ({})", entry.id, entry.title)?;
    Ok(())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "entry durations are far below 2^52 seconds"
)]
pub fn stop<W: Write>(writer: &mut W, db: &mut Database, user: &str) -> Result<()> {
    let user = UserId::new(user)?;

    let entry = db.stop_timer(&user)?;
    let worked = entry.duration_seconds as f64 / 3600.0;
    writeln!(writer, "Stopped timer for {user}")?;
    writeln!(
        writer,
        "Entry: {} ({}), worked {}",
        entry.id,
        entry.title,
        format_hours(worked)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use trackify_core::EngineError;
    use trackify_db::DbError;

    fn open_db() -> (tempfile::TempDir, Database) {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::open(&temp.path().join("trackify.db")).unwrap();
        (temp, db)
    }

    #[test]
    fn start_then_stop_prints_entry_and_duration() {
        let (_temp, mut db) = open_db();
        let mut output = Vec::new();

        start(&mut output, &mut db, "alice", "acme", "proj-1", "deep work", false).unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Started timer for alice in acme"));
        assert!(printed.contains("deep work"));

        let mut output = Vec::new();
        stop(&mut output, &mut db, "alice").unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Stopped timer for alice"));
        assert!(printed.contains("0h 0m"));
    }

    #[test]
    fn double_start_surfaces_conflict() {
        let (_temp, mut db) = open_db();
        let mut output = Vec::new();

        start(&mut output, &mut db, "alice", "acme", "proj-1", "one", false).unwrap();
        let err = start(&mut output, &mut db, "alice", "acme", "proj-1", "two", false).unwrap_err();
        let db_err = err.downcast_ref::<DbError>().unwrap();
        assert!(matches!(db_err, DbError::Engine(EngineError::Conflict { .. })));
    }

    #[test]
    fn stop_reports_elapsed_hours() {
        let (_temp, mut db) = open_db();
        let user = UserId::new("alice").unwrap();
        let workspace = WorkspaceId::new("acme").unwrap();
        let project = ProjectId::new("proj-1").unwrap();

        // Backdate the open entry so the printed duration is non-zero.
        let entry = db
            .start_timer(&user, &workspace, &project, "work", false)
            .unwrap();
        let patch = trackify_db::EntryPatch {
            start_time: Some(Utc::now() - Duration::minutes(90)),
            ..trackify_db::EntryPatch::default()
        };
        db.edit_entry(&entry.id, &patch).unwrap();

        let mut output = Vec::new();
        stop(&mut output, &mut db, "alice").unwrap();
        assert!(String::from_utf8(output).unwrap().contains("1h 30m"));
    }
}
