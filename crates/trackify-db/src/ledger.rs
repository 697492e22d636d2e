//! Entry ledger: timers, entry edits and range listing.
//!
//! Start/stop run inside a transaction with a conditional update keyed on
//! the timer's `is_running` flag, so two racing starts cannot both succeed:
//! the loser observes the flag and fails with a conflict.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use trackify_core::{
    EngineError, Entry, EntryId, ProjectId, Timer, UserId, WorkspaceId,
    duration_seconds_between,
};
use uuid::Uuid;

use crate::{Database, DbError, format_timestamp, parse_timestamp};

/// A patch of editable entry fields; `None` leaves the field unchanged.
#[derive(Debug, Default, Clone)]
pub struct EntryPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub project_id: Option<ProjectId>,
    pub is_billable: Option<bool>,
}

/// Entry columns as read from the database, before decoding.
#[derive(Debug)]
struct RawEntry {
    id: String,
    user_id: String,
    workspace_id: String,
    project_id: String,
    title: String,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: i64,
    is_billable: i64,
}

const ENTRY_COLUMNS: &str = "id, user_id, workspace_id, project_id, title, \
     start_time, end_time, duration_seconds, is_billable";

fn raw_entry_from_row(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        workspace_id: row.get(2)?,
        project_id: row.get(3)?,
        title: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        duration_seconds: row.get(7)?,
        is_billable: row.get(8)?,
    })
}

fn entry_from_raw(raw: RawEntry) -> Result<Entry, DbError> {
    let start_time = parse_timestamp(&raw.start_time, &raw.id)?;
    let end_time = match raw.end_time.as_deref() {
        Some(end) => Some(parse_timestamp(end, &raw.id)?),
        None => None,
    };
    Ok(Entry {
        id: EntryId::new(raw.id)?,
        user_id: UserId::new(raw.user_id)?,
        workspace_id: WorkspaceId::new(raw.workspace_id)?,
        project_id: ProjectId::new(raw.project_id)?,
        title: raw.title,
        start_time,
        end_time,
        duration_seconds: raw.duration_seconds,
        is_billable: raw.is_billable != 0,
    })
}

fn read_entry(conn: &Connection, entry_id: &EntryId) -> Result<Option<Entry>, DbError> {
    let raw = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
            [entry_id.as_str()],
            raw_entry_from_row,
        )
        .optional()?;
    raw.map(entry_from_raw).transpose()
}

impl Database {
    /// Starts the user's timer, creating an open entry.
    ///
    /// Fails with a conflict if a timer is already running for the user.
    pub fn start_timer(
        &mut self,
        user: &UserId,
        workspace: &WorkspaceId,
        project: &ProjectId,
        title: &str,
        is_billable: bool,
    ) -> Result<Entry, DbError> {
        self.start_timer_at(user, workspace, project, title, is_billable, Utc::now())
    }

    pub(crate) fn start_timer_at(
        &mut self,
        user: &UserId,
        workspace: &WorkspaceId,
        project: &ProjectId,
        title: &str,
        is_billable: bool,
        now: DateTime<Utc>,
    ) -> Result<Entry, DbError> {
        let tx = self.conn.transaction()?;

        let running: Option<i64> = tx
            .query_row(
                "SELECT is_running FROM timers WHERE user_id = ?",
                [user.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if running == Some(1) {
            return Err(EngineError::conflict(format!(
                "timer already running for user {user}"
            ))
            .into());
        }

        let entry = Entry {
            id: EntryId::new(Uuid::new_v4().to_string())?,
            user_id: user.clone(),
            workspace_id: workspace.clone(),
            project_id: project.clone(),
            title: title.to_string(),
            start_time: now,
            end_time: None,
            duration_seconds: 0,
            is_billable,
        };
        tx.execute(
            "
            INSERT INTO entries
            (id, user_id, workspace_id, project_id, title, start_time, end_time, duration_seconds, is_billable)
            VALUES (?, ?, ?, ?, ?, ?, NULL, 0, ?)
            ",
            params![
                entry.id.as_str(),
                entry.user_id.as_str(),
                entry.workspace_id.as_str(),
                entry.project_id.as_str(),
                entry.title,
                format_timestamp(entry.start_time),
                i64::from(entry.is_billable),
            ],
        )?;

        // Conditional upsert: the WHERE guard makes a lost race visible as
        // zero affected rows instead of a silent overwrite.
        let flipped = tx.execute(
            "
            INSERT INTO timers (user_id, workspace_id, is_running, current_entry_id)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                workspace_id = excluded.workspace_id,
                is_running = 1,
                current_entry_id = excluded.current_entry_id
            WHERE timers.is_running = 0
            ",
            params![user.as_str(), workspace.as_str(), entry.id.as_str()],
        )?;
        if flipped == 0 {
            return Err(EngineError::conflict(format!(
                "timer already running for user {user}"
            ))
            .into());
        }

        tx.commit()?;
        tracing::debug!(user = %user, entry = %entry.id, "timer started");
        Ok(entry)
    }

    /// Stops the user's running timer and closes its entry.
    ///
    /// Fails with not-found if no timer is running for the user. The timer
    /// keeps referencing the closed entry for later inspection.
    pub fn stop_timer(&mut self, user: &UserId) -> Result<Entry, DbError> {
        self.stop_timer_at(user, Utc::now())
    }

    pub(crate) fn stop_timer_at(
        &mut self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Entry, DbError> {
        let tx = self.conn.transaction()?;

        let timer: Option<(i64, Option<String>)> = tx
            .query_row(
                "SELECT is_running, current_entry_id FROM timers WHERE user_id = ?",
                [user.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((1, current_entry_id)) = timer else {
            return Err(
                EngineError::not_found(format!("no running timer for user {user}")).into(),
            );
        };
        let Some(entry_id) = current_entry_id else {
            return Err(EngineError::computation(format!(
                "running timer without an entry for user {user}"
            ))
            .into());
        };

        let entry_id = EntryId::new(entry_id)?;
        let Some(mut entry) = read_entry(&tx, &entry_id)? else {
            return Err(EngineError::computation(format!(
                "timer for user {user} references missing entry {entry_id}"
            ))
            .into());
        };
        if !entry.is_open() {
            return Err(EngineError::computation(format!(
                "timer for user {user} references closed entry {entry_id}"
            ))
            .into());
        }
        entry.close(now).map_err(EngineError::from)?;

        tx.execute(
            "UPDATE entries SET end_time = ?, duration_seconds = ? WHERE id = ?",
            params![
                format_timestamp(now),
                entry.duration_seconds,
                entry.id.as_str()
            ],
        )?;
        let flipped = tx.execute(
            "UPDATE timers SET is_running = 0 WHERE user_id = ? AND is_running = 1",
            [user.as_str()],
        )?;
        if flipped == 0 {
            return Err(
                EngineError::not_found(format!("no running timer for user {user}")).into(),
            );
        }

        tx.commit()?;
        tracing::debug!(user = %user, entry = %entry.id, seconds = entry.duration_seconds, "timer stopped");
        Ok(entry)
    }

    /// Returns the user's timer, if one has ever been created.
    pub fn timer(&self, user: &UserId) -> Result<Option<Timer>, DbError> {
        let row: Option<(String, i64, Option<String>)> = self
            .conn
            .query_row(
                "SELECT workspace_id, is_running, current_entry_id FROM timers WHERE user_id = ?",
                [user.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((workspace_id, is_running, current_entry_id)) = row else {
            return Ok(None);
        };
        Ok(Some(Timer {
            user_id: user.clone(),
            workspace_id: WorkspaceId::new(workspace_id)?,
            is_running: is_running != 0,
            current_entry_id: current_entry_id.map(EntryId::new).transpose()?,
        }))
    }

    /// Fetches a single entry by ID.
    pub fn entry(&self, entry_id: &EntryId) -> Result<Option<Entry>, DbError> {
        read_entry(&self.conn, entry_id)
    }

    /// Applies a patch to an entry, recomputing the duration when both
    /// times are present.
    ///
    /// Setting an end time on the currently open entry is a conflict: the
    /// timer must be stopped first so the timer invariant keeps holding.
    pub fn edit_entry(&mut self, entry_id: &EntryId, patch: &EntryPatch) -> Result<Entry, DbError> {
        let tx = self.conn.transaction()?;

        let Some(mut entry) = read_entry(&tx, entry_id)? else {
            return Err(EngineError::not_found(format!("entry {entry_id} not found")).into());
        };
        if entry.is_open() && patch.end_time.is_some() {
            return Err(EngineError::conflict(format!(
                "entry {entry_id} is open; stop the timer before setting an end time"
            ))
            .into());
        }

        if let Some(title) = &patch.title {
            entry.title.clone_from(title);
        }
        if let Some(project) = &patch.project_id {
            entry.project_id = project.clone();
        }
        if let Some(billable) = patch.is_billable {
            entry.is_billable = billable;
        }
        let start = patch.start_time.unwrap_or(entry.start_time);
        let end = patch.end_time.or(entry.end_time);
        entry.set_times(start, end).map_err(EngineError::from)?;

        tx.execute(
            "
            UPDATE entries
            SET project_id = ?, title = ?, start_time = ?, end_time = ?,
                duration_seconds = ?, is_billable = ?
            WHERE id = ?
            ",
            params![
                entry.project_id.as_str(),
                entry.title,
                format_timestamp(entry.start_time),
                entry.end_time.map(format_timestamp),
                entry.duration_seconds,
                i64::from(entry.is_billable),
                entry.id.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(entry)
    }

    /// Deletes a closed entry.
    ///
    /// Deleting the open entry is a conflict; stop the timer first.
    pub fn delete_entry(&mut self, entry_id: &EntryId) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;

        let Some(entry) = read_entry(&tx, entry_id)? else {
            return Err(EngineError::not_found(format!("entry {entry_id} not found")).into());
        };
        if entry.is_open() {
            return Err(EngineError::conflict(format!(
                "entry {entry_id} is open; stop the timer before deleting it"
            ))
            .into());
        }

        tx.execute("DELETE FROM entries WHERE id = ?", [entry_id.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    /// Lists a user's entries in a workspace ordered by start time.
    ///
    /// Bounds are optional; `from` is inclusive and `to` exclusive on the
    /// entry's start time. The listing keeps no cursor state, so repeated
    /// calls are restartable.
    pub fn list_entries(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Entry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE user_id = ?1 AND workspace_id = ?2
              AND (?3 IS NULL OR start_time >= ?3)
              AND (?4 IS NULL OR start_time < ?4)
            ORDER BY start_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(
            params![
                user.as_str(),
                workspace.as_str(),
                from.map(format_timestamp),
                to.map(format_timestamp),
            ],
            raw_entry_from_row,
        )?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(entry_from_raw(row?)?);
        }
        Ok(entries)
    }

    /// Lists all currently open entries, oldest first.
    pub fn open_entries(&self) -> Result<Vec<Entry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS}
            FROM entries
            WHERE end_time IS NULL
            ORDER BY start_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([], raw_entry_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(entry_from_raw(row?)?);
        }
        Ok(entries)
    }

    /// Entry counts grouped by workspace, largest first.
    pub fn entry_counts_by_workspace(&self) -> Result<Vec<(String, i64)>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT workspace_id, COUNT(*) AS entry_count
            FROM entries
            GROUP BY workspace_id
            ORDER BY entry_count DESC, workspace_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Verifies the closed-entry duration invariant for every stored entry.
    ///
    /// Returns the IDs of entries whose stored duration disagrees with
    /// their timestamps. Used by migrations and consistency checks.
    pub fn inconsistent_entry_ids(&self) -> Result<Vec<EntryId>, DbError> {
        let mut stmt = self.conn.prepare(
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
        let mut inconsistent = Vec::new();
        for row in rows {
            let (id, start, end, stored) = row?;
            let start = parse_timestamp(&start, &id)?;
            let end = parse_timestamp(&end, &id)?;
            let expected = duration_seconds_between(start, end).map_err(EngineError::from)?;
            if expected != stored {
                inconsistent.push(EntryId::new(id)?);
            }
        }
        Ok(inconsistent)
    }
}
