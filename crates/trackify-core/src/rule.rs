//! Working-hours rules, holiday calendars and ideal-hours evaluation.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{HolidayKind, UserId, ValidationError, WorkspaceId};

/// Per-workspace working-hours policy.
///
/// At most one rule is active per workspace at evaluation time; the storage
/// layer resolves ties by most-recently-created. When no rule is active the
/// built-in default of [`WorkRule::default_for`] applies.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRule {
    pub workspace_id: WorkspaceId,
    pub working_hours_per_day: f64,
    pub working_days_per_week: u8,
    pub week_days: HashSet<Weekday>,
    pub is_overtime_enabled: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl WorkRule {
    /// The built-in fallback policy: 8 hours/day, Mon-Fri, overtime enabled.
    #[must_use]
    pub fn default_for(workspace_id: WorkspaceId, created_at: DateTime<Utc>) -> Self {
        Self {
            workspace_id,
            working_hours_per_day: 8.0,
            working_days_per_week: 5,
            week_days: HashSet::from([
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
            is_overtime_enabled: true,
            is_active: true,
            created_at,
        }
    }

    /// Validates the policy fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.working_hours_per_day <= 0.0 || self.working_hours_per_day.is_nan() {
            return Err(ValidationError::NonPositiveHours {
                value: self.working_hours_per_day,
            });
        }
        if self.week_days.is_empty() {
            return Err(ValidationError::Empty {
                field: "rule week days",
            });
        }
        Ok(())
    }
}

/// A workspace or user-specific holiday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub workspace_id: WorkspaceId,
    /// `None` means the holiday applies workspace-wide.
    pub user_id: Option<UserId>,
    pub date: NaiveDate,
    pub title: String,
    pub kind: HolidayKind,
    pub is_active: bool,
}

impl Holiday {
    /// Returns true if this holiday removes `date` from `user`'s working days.
    #[must_use]
    pub fn applies_to(&self, user: &UserId) -> bool {
        self.is_active && self.user_id.as_ref().is_none_or(|scoped| scoped == user)
    }
}

/// Collects the distinct dates covered by holidays applicable to `user`.
///
/// Overlapping holiday records on one date collapse into a single
/// non-working day; the effect is idempotent, not additive.
#[must_use]
pub fn applicable_holiday_dates(holidays: &[Holiday], user: &UserId) -> HashSet<NaiveDate> {
    holidays
        .iter()
        .filter(|holiday| holiday.applies_to(user))
        .map(|holiday| holiday.date)
        .collect()
}

/// Policy-computed required hours over a date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdealHours {
    pub total_hours: f64,
    pub total_days: u32,
}

/// Computes the ideal required hours for the inclusive range `[start, end]`.
///
/// A calendar day counts as working iff its weekday is in the rule's
/// `week_days` and its date is absent from `holiday_dates`. The caller is
/// responsible for filtering `holiday_dates` down to active holidays
/// applicable to the user in question, e.g. via
/// [`applicable_holiday_dates`].
pub fn compute_ideal_hours(
    rule: &WorkRule,
    holiday_dates: &HashSet<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IdealHours, ValidationError> {
    if start > end {
        return Err(ValidationError::ReversedDateRange { start, end });
    }
    rule.validate()?;

    let total_days = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| rule.week_days.contains(&day.weekday()) && !holiday_dates.contains(day))
        .count();
    let total_days = u32::try_from(total_days).unwrap_or(u32::MAX);

    Ok(IdealHours {
        total_hours: f64::from(total_days) * rule.working_hours_per_day,
        total_days,
    })
}

/// Parses a weekday name as stored in rule records.
///
/// Accepts full names and three-letter abbreviations, case-insensitive.
pub fn weekday_from_name(name: &str) -> Result<Weekday, ValidationError> {
    name.parse::<Weekday>()
        .map_err(|_| ValidationError::InvalidWeekday {
            value: name.to_string(),
        })
}

/// Canonical lowercase full name for a weekday, as stored in rule records.
#[must_use]
pub const fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
