//! Status command: running timers and workspace entry counts.

use std::io::Write;

use anyhow::Result;
use trackify_core::UserId;
use trackify_db::Database;

/// With a user, shows that user's timer state and open entry. Without one,
/// shows every open entry and per-workspace entry counts.
pub fn run<W: Write>(writer: &mut W, db: &Database, user: Option<&str>) -> Result<()> {
    match user {
        Some(user) => user_status(writer, db, user),
        None => overview(writer, db),
    }
}

fn user_status<W: Write>(writer: &mut W, db: &Database, user: &str) -> Result<()> {
    let user = UserId::new(user)?;

    let Some(timer) = db.timer(&user)? else {
        writeln!(writer, "No timer for {user}")?;
        return Ok(());
    };

    if timer.is_running {
        writeln!(writer, "Timer running for {user} in {}", timer.workspace_id)?;
        if let Some(entry_id) = &timer.current_entry_id {
            if let Some(entry) = db.entry(entry_id)? {
                writeln!(
                    writer,
                    "Open entry: {} ({}) started {}",
                    entry.id,
                    entry.title,
                    entry.start_time.to_rfc3339()
                )?;
            }
        }
    } else {
        writeln!(writer, "Timer stopped for {user}")?;
    }
    Ok(())
}

fn overview<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let open = db.open_entries()?;
    if open.is_empty() {
        writeln!(writer, "No running timers.")?;
    } else {
        writeln!(writer, "Running timers:")?;
        for entry in &open {
            writeln!(
                writer,
                "- {} in {}: {} (since {})",
                entry.user_id,
                entry.workspace_id,
                entry.title,
                entry.start_time.to_rfc3339()
            )?;
        }
    }

    let counts = db.entry_counts_by_workspace()?;
    if !counts.is_empty() {
        writeln!(writer, "Entries per workspace:")?;
        for (workspace, count) in &counts {
            writeln!(writer, "- {workspace}: {count}")?;
        }
    }
    Ok(())
}
