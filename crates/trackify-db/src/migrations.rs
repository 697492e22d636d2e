//! Data repair passes for databases written by older builds.
//!
//! Early builds stored closed entries without a precomputed duration and
//! rule week days in whatever casing the client sent. Both passes rewrite
//! rows in place and are idempotent: a second run examines the same rows
//! and updates none.

use trackify_core::duration_seconds_between;

use crate::{Database, DbError, parse_timestamp};
use crate::policy::{week_days_from_json, week_days_json};

/// Outcome of one migration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Rows inspected by the pass.
    pub examined: usize,
    /// Rows rewritten by the pass.
    pub updated: usize,
}

impl Database {
    /// Runs all migration passes, returning combined totals.
    pub fn run_migrations(&mut self) -> Result<MigrationStats, DbError> {
        let durations = self.backfill_entry_durations()?;
        let weekdays = self.normalize_rule_weekdays()?;
        Ok(MigrationStats {
            examined: durations.examined + weekdays.examined,
            updated: durations.updated + weekdays.updated,
        })
    }

    /// Recomputes `duration_seconds` for closed entries where the stored
    /// value disagrees with `end_time - start_time`.
    pub fn backfill_entry_durations(&mut self) -> Result<MigrationStats, DbError> {
        let tx = self.conn.transaction()?;
        let mut stats = MigrationStats::default();
        {
            let mut stmt = tx.prepare(
                "
                SELECT id, start_time, end_time, duration_seconds
                FROM entries
                WHERE end_time IS NOT NULL
                ORDER BY id ASC
                ",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;

            let mut fixes = Vec::new();
            for row in rows {
                let (id, start_time, end_time, stored) = row?;
                stats.examined += 1;
                let start = parse_timestamp(&start_time, &id)?;
                let end = parse_timestamp(&end_time, &id)?;
                let computed = duration_seconds_between(start, end)?;
                if computed != stored {
                    fixes.push((id, computed));
                }
            }
            drop(stmt);

            for (id, computed) in fixes {
                tx.execute(
                    "UPDATE entries SET duration_seconds = ? WHERE id = ?",
                    rusqlite::params![computed, id],
                )?;
                stats.updated += 1;
            }
        }
        tx.commit()?;
        tracing::info!(
            examined = stats.examined,
            updated = stats.updated,
            "entry duration backfill complete"
        );
        Ok(stats)
    }

    /// Rewrites rule `week_days` columns into the canonical form: lowercase
    /// full day names, Monday first. Accepts legacy capitalized and
    /// three-letter names.
    pub fn normalize_rule_weekdays(&mut self) -> Result<MigrationStats, DbError> {
        let tx = self.conn.transaction()?;
        let mut stats = MigrationStats::default();
        {
            let mut stmt = tx.prepare("SELECT id, week_days FROM rules ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut fixes = Vec::new();
            for row in rows {
                let (id, stored) = row?;
                stats.examined += 1;
                let days = week_days_from_json(&stored, &id)?;
                let canonical = week_days_json(&days)?;
                if canonical != stored {
                    fixes.push((id, canonical));
                }
            }
            drop(stmt);

            for (id, canonical) in fixes {
                tx.execute(
                    "UPDATE rules SET week_days = ? WHERE id = ?",
                    rusqlite::params![canonical, id],
                )?;
                stats.updated += 1;
            }
        }
        tx.commit()?;
        tracing::info!(
            examined = stats.examined,
            updated = stats.updated,
            "rule week day normalization complete"
        );
        Ok(stats)
    }
}
