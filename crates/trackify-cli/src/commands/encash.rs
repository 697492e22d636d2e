//! Leave encashment command.

use std::io::Write;

use anyhow::Result;
use trackify_core::{LeavePolicy, UserId, WorkspaceId};
use trackify_db::Database;

use super::util::format_hours;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    user: &str,
    workspace: &str,
    by: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workspace = WorkspaceId::new(workspace)?;
    let by = by.map(UserId::new).transpose()?;

    let record = db.encash_leaves(&user, &workspace, &LeavePolicy::default(), by.as_ref())?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&record)?)?;
        return Ok(());
    }

    writeln!(writer, "Encashed leaves for {user} in {workspace}")?;
    for line in &record.leaves {
        writeln!(
            writer,
            "- {}: {} of {} encashed, {} remaining",
            line.leave_type,
            format_hours(line.encashed),
            format_hours(line.available),
            format_hours(line.remaining)
        )?;
    }
    writeln!(writer, "Total encashed: {}", format_hours(record.total_encashable))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackify_core::{EngineError, LeaveType};
    use trackify_db::DbError;

    fn open_db() -> (tempfile::TempDir, Database) {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::open(&temp.path().join("trackify.db")).unwrap();
        (temp, db)
    }

    #[test]
    fn prints_per_type_settlement() {
        let (_temp, mut db) = open_db();
        let user = UserId::new("alice").unwrap();
        let workspace = WorkspaceId::new("acme").unwrap();
        db.set_leave_balance(&user, &workspace, LeaveType::Casual, 40.0)
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &mut db, "alice", "acme", Some("boss"), false).unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Encashed leaves for alice in acme"));
        assert!(printed.contains("casual: 20h 0m of 40h 0m encashed, 20h 0m remaining"));
        assert!(printed.contains("Total encashed: 20h 0m"));

        let history = db.encashments(&user, &workspace).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].encashed_by, Some(UserId::new("boss").unwrap()));
    }

    #[test]
    fn empty_balances_fail_with_validation_error() {
        let (_temp, mut db) = open_db();
        let mut output = Vec::new();
        let err = run(&mut output, &mut db, "alice", "acme", None, false).unwrap_err();
        let db_err = err.downcast_ref::<DbError>().unwrap();
        assert!(matches!(db_err, DbError::Engine(EngineError::Validation(_))));
    }
}
