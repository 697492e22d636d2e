//! Time entries and the per-user timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntryId, ProjectId, UserId, ValidationError, WorkspaceId};

/// A single tracked time entry.
///
/// An entry with no `end_time` is open: it is the entry the user's timer is
/// currently accumulating into. At most one open entry exists per user; the
/// storage layer enforces this through the [`Timer`] singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub project_id: ProjectId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between start and end; zero while the entry is open.
    pub duration_seconds: i64,
    pub is_billable: bool,
}

impl Entry {
    /// Returns true if the entry has no end time yet.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closes the entry at `end`, recomputing the duration.
    pub fn close(&mut self, end: DateTime<Utc>) -> Result<(), ValidationError> {
        self.duration_seconds = duration_seconds_between(self.start_time, end)?;
        self.end_time = Some(end);
        Ok(())
    }

    /// Replaces the entry's times, recomputing the duration when both are set.
    pub fn set_times(
        &mut self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), ValidationError> {
        self.duration_seconds = match end {
            Some(end) => duration_seconds_between(start, end)?,
            None => 0,
        };
        self.start_time = start;
        self.end_time = end;
        Ok(())
    }
}

/// Computes the whole-second duration between two timestamps.
///
/// Fails if `end` precedes `start`; the result is always non-negative.
pub fn duration_seconds_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, ValidationError> {
    if end < start {
        return Err(ValidationError::EndBeforeStart { start, end });
    }
    Ok(end.signed_duration_since(start).num_seconds())
}

/// Per-user timer singleton.
///
/// `is_running` is true iff `current_entry_id` references an open entry
/// owned by the same user. After a stop the entry reference is kept so the
/// last tracked entry stays discoverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub is_running: bool,
    pub current_entry_id: Option<EntryId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_at(start: DateTime<Utc>) -> Entry {
        Entry {
            id: EntryId::new("entry-1").unwrap(),
            user_id: UserId::new("alice").unwrap(),
            workspace_id: WorkspaceId::new("acme").unwrap(),
            project_id: ProjectId::new("proj-1").unwrap(),
            title: "deep work".to_string(),
            start_time: start,
            end_time: None,
            duration_seconds: 0,
            is_billable: true,
        }
    }

    #[test]
    fn duration_is_whole_seconds() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 6, 17, 30, 0).unwrap();
        assert_eq!(duration_seconds_between(start, end).unwrap(), 30_600);
    }

    #[test]
    fn duration_rejects_reversed_times() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        assert_eq!(
            duration_seconds_between(start, end),
            Err(ValidationError::EndBeforeStart { start, end })
        );
    }

    #[test]
    fn zero_length_entry_is_valid() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        assert_eq!(duration_seconds_between(start, start).unwrap(), 0);
    }

    #[test]
    fn close_sets_end_and_duration() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 6, 10, 15, 0).unwrap();
        let mut entry = entry_at(start);
        assert!(entry.is_open());

        entry.close(end).unwrap();
        assert!(!entry.is_open());
        assert_eq!(entry.end_time, Some(end));
        assert_eq!(entry.duration_seconds, 4_500);
    }

    #[test]
    fn set_times_recomputes_duration() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        let mut entry = entry_at(start);
        entry.close(end).unwrap();

        let new_start = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        entry.set_times(new_start, Some(end)).unwrap();
        assert_eq!(entry.duration_seconds, 7_200);

        // Invariant holds after every edit.
        let elapsed = entry.end_time.unwrap() - entry.start_time;
        assert_eq!(entry.duration_seconds, elapsed.num_seconds());
    }

    #[test]
    fn set_times_rejects_end_before_start() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let mut entry = entry_at(start);
        let bad_end = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        assert!(entry.set_times(start, Some(bad_end)).is_err());
        // The entry is left untouched on failure.
        assert!(entry.is_open());
        assert_eq!(entry.duration_seconds, 0);
    }
}
