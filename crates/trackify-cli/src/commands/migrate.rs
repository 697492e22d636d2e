//! Data repair migrations.

use std::io::Write;

use anyhow::Result;
use trackify_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &mut Database) -> Result<()> {
    let stats = db.run_migrations()?;
    writeln!(
        writer,
        "Migrations complete: {} rows examined, {} updated",
        stats.examined, stats.updated
    )?;
    Ok(())
}
