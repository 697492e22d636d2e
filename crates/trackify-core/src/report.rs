//! Monthly reconciliation: worked vs. ideal hours, overtime/undertime and
//! leave deductions.
//!
//! The functions here are pure; the storage layer gathers entries, rules,
//! holidays and balances, calls [`reconcile_month`], and persists the
//! resulting row in a single upsert.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::rule::IdealHours;
use crate::types::{LeaveType, UserId, ValidationError, WorkspaceId};

/// Seconds per hour, for converting ledger durations into report hours.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// A user's available balance for one leave type, in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveBalance {
    pub leave_type: LeaveType,
    pub available_hours: f64,
}

/// Workspace leave policy: deduction priority and encashable fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct LeavePolicy {
    /// Order in which undertime is deducted from paid leave balances.
    pub deduction_order: Vec<LeaveType>,
    /// Fraction of an available balance that may be encashed.
    pub encashable_fraction: f64,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            deduction_order: vec![LeaveType::Casual, LeaveType::Sick, LeaveType::Earned],
            encashable_fraction: 0.5,
        }
    }
}

impl LeavePolicy {
    /// Validates the policy fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.deduction_order.is_empty() {
            return Err(ValidationError::Empty {
                field: "leave deduction order",
            });
        }
        if self.encashable_fraction.is_nan() || !(0.0..=1.0).contains(&self.encashable_fraction) {
            return Err(ValidationError::FractionOutOfRange {
                value: self.encashable_fraction,
            });
        }
        Ok(())
    }
}

/// One undertime deduction against a paid leave balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveDeduction {
    pub leave_type: LeaveType,
    pub deducted_hours: f64,
}

/// Per-user reconciliation result for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub user_id: UserId,
    pub ideal_hours: f64,
    pub worked_hours: f64,
    pub overtime: f64,
    pub undertime: f64,
    pub undertime_deductions: Vec<LeaveDeduction>,
    /// Distinct day-of-month values with at least one closed entry, ascending.
    pub dates_worked: Vec<u32>,
    /// Hours of leave consumed this month, paid plus unpaid.
    pub total_leaves: f64,
    pub paid_leaves: f64,
    pub unpaid_leaves: f64,
}

/// A persisted monthly report, unique per (workspace, user, month, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub month: u32,
    pub year: i32,
    pub ideal_monthly_hours: f64,
    pub row: ReportRow,
    pub generated_at: DateTime<Utc>,
}

/// Returns the first and last calendar day of `(year, month)`.
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(ValidationError::InvalidMonth { value: month })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(ValidationError::InvalidMonth { value: month })?;
    Ok((first, next_first - chrono::Duration::days(1)))
}

/// Reconciles a user's worked time against the ideal hours for one month.
///
/// Undertime is deducted from `balances` in the order given by
/// `policy.deduction_order`, up to each balance's available hours. Whatever
/// remains uncovered stays unpaid and is still reflected in `undertime`.
/// Balances are read, never mutated, so re-running the reconciliation with
/// unchanged inputs yields an identical row.
#[expect(
    clippy::cast_precision_loss,
    reason = "worked seconds are far below 2^52"
)]
pub fn reconcile_month(
    user_id: UserId,
    ideal: &IdealHours,
    worked_seconds: i64,
    mut dates_worked: Vec<u32>,
    overtime_enabled: bool,
    balances: &[LeaveBalance],
    policy: &LeavePolicy,
) -> Result<ReportRow, EngineError> {
    if worked_seconds < 0 {
        return Err(EngineError::computation(format!(
            "negative worked seconds ({worked_seconds}) for user {user_id}"
        )));
    }
    policy.validate()?;

    dates_worked.sort_unstable();
    dates_worked.dedup();

    let worked_hours = worked_seconds as f64 / SECONDS_PER_HOUR;
    let overtime = if overtime_enabled {
        (worked_hours - ideal.total_hours).max(0.0)
    } else {
        0.0
    };
    let undertime = (ideal.total_hours - worked_hours).max(0.0);

    let mut undertime_deductions = Vec::new();
    let mut uncovered = undertime;
    for leave_type in &policy.deduction_order {
        if uncovered <= 0.0 {
            break;
        }
        let available = balances
            .iter()
            .find(|balance| balance.leave_type == *leave_type)
            .map_or(0.0, |balance| balance.available_hours);
        let deducted = uncovered.min(available.max(0.0));
        if deducted > 0.0 {
            undertime_deductions.push(LeaveDeduction {
                leave_type: *leave_type,
                deducted_hours: deducted,
            });
            uncovered -= deducted;
        }
    }

    let paid_leaves: f64 = undertime_deductions
        .iter()
        .map(|deduction| deduction.deducted_hours)
        .sum();
    let unpaid_leaves = uncovered;

    Ok(ReportRow {
        user_id,
        ideal_hours: ideal.total_hours,
        worked_hours,
        overtime,
        undertime,
        undertime_deductions,
        dates_worked,
        total_leaves: paid_leaves + unpaid_leaves,
        paid_leaves,
        unpaid_leaves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn january_ideal() -> IdealHours {
        IdealHours {
            total_hours: 184.0,
            total_days: 23,
        }
    }

    const fn hours(h: i64) -> i64 {
        h * 3600
    }

    #[test]
    fn month_range_covers_whole_month() {
        let (first, last) = month_range(2025, 1).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

        let (first, last) = month_range(2024, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (first, last) = month_range(2025, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn month_range_rejects_bad_month() {
        assert!(month_range(2025, 0).is_err());
        assert!(month_range(2025, 13).is_err());
    }

    #[test]
    fn overtime_when_worked_exceeds_ideal() {
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(200),
            vec![6, 7, 8],
            true,
            &[],
            &LeavePolicy::default(),
        )
        .unwrap();

        assert!((row.overtime - 16.0).abs() < f64::EPSILON);
        assert!((row.undertime - 0.0).abs() < f64::EPSILON);
        assert!(row.undertime_deductions.is_empty());
        assert!((row.total_leaves - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overtime_gated_on_rule_flag() {
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(200),
            vec![],
            false,
            &[],
            &LeavePolicy::default(),
        )
        .unwrap();

        assert!((row.overtime - 0.0).abs() < f64::EPSILON);
        assert!((row.undertime - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn undertime_covered_by_casual_leave() {
        let balances = [LeaveBalance {
            leave_type: LeaveType::Casual,
            available_hours: 40.0,
        }];
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(150),
            vec![6, 7],
            true,
            &balances,
            &LeavePolicy::default(),
        )
        .unwrap();

        assert!((row.undertime - 34.0).abs() < f64::EPSILON);
        assert_eq!(row.undertime_deductions.len(), 1);
        assert_eq!(row.undertime_deductions[0].leave_type, LeaveType::Casual);
        assert!((row.undertime_deductions[0].deducted_hours - 34.0).abs() < f64::EPSILON);
        assert!((row.paid_leaves - 34.0).abs() < f64::EPSILON);
        assert!((row.unpaid_leaves - 0.0).abs() < f64::EPSILON);
        assert!((row.total_leaves - 34.0).abs() < f64::EPSILON);
    }

    #[test]
    fn undertime_spills_across_leave_types_in_priority_order() {
        let balances = [
            LeaveBalance {
                leave_type: LeaveType::Sick,
                available_hours: 30.0,
            },
            LeaveBalance {
                leave_type: LeaveType::Casual,
                available_hours: 10.0,
            },
        ];
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(150),
            vec![],
            true,
            &balances,
            &LeavePolicy::default(),
        )
        .unwrap();

        // Casual drains first despite appearing second in the balance list.
        assert_eq!(row.undertime_deductions.len(), 2);
        assert_eq!(row.undertime_deductions[0].leave_type, LeaveType::Casual);
        assert!((row.undertime_deductions[0].deducted_hours - 10.0).abs() < f64::EPSILON);
        assert_eq!(row.undertime_deductions[1].leave_type, LeaveType::Sick);
        assert!((row.undertime_deductions[1].deducted_hours - 24.0).abs() < f64::EPSILON);
        assert!((row.unpaid_leaves - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uncovered_undertime_stays_unpaid() {
        let balances = [LeaveBalance {
            leave_type: LeaveType::Casual,
            available_hours: 10.0,
        }];
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(150),
            vec![],
            true,
            &balances,
            &LeavePolicy::default(),
        )
        .unwrap();

        assert!((row.undertime - 34.0).abs() < f64::EPSILON);
        assert!((row.paid_leaves - 10.0).abs() < f64::EPSILON);
        assert!((row.unpaid_leaves - 24.0).abs() < f64::EPSILON);
        assert!((row.total_leaves - 34.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dates_worked_are_sorted_and_distinct() {
        let row = reconcile_month(
            user(),
            &january_ideal(),
            hours(184),
            vec![9, 3, 9, 1, 3],
            true,
            &[],
            &LeavePolicy::default(),
        )
        .unwrap();
        assert_eq!(row.dates_worked, vec![1, 3, 9]);
    }

    #[test]
    fn negative_worked_seconds_is_a_computation_error() {
        let result = reconcile_month(
            user(),
            &january_ideal(),
            -1,
            vec![],
            true,
            &[],
            &LeavePolicy::default(),
        );
        assert!(matches!(result, Err(EngineError::Computation { .. })));
    }

    #[test]
    fn reconcile_is_deterministic() {
        let balances = [LeaveBalance {
            leave_type: LeaveType::Casual,
            available_hours: 40.0,
        }];
        let run = || {
            reconcile_month(
                user(),
                &january_ideal(),
                hours(150),
                vec![7, 6],
                true,
                &balances,
                &LeavePolicy::default(),
            )
            .unwrap()
        };
        let first = serde_json::to_string(&run()).unwrap();
        let second = serde_json::to_string(&run()).unwrap();
        assert_eq!(first, second);
    }
}
