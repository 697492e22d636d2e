//! Core domain logic for the Trackify time accounting engine.
//!
//! This crate contains the fundamental types and logic for:
//! - Entries and timers: validated time entry records and the per-user timer
//! - Rule evaluation: computing ideal working hours over a date range
//! - Reconciliation: monthly overtime/undertime and leave deduction math
//! - Encashment: converting unused leave balances into settlements
//!
//! Everything here is pure: persistence and clocks live in the callers.

pub mod encash;
mod entry;
mod error;
pub mod report;
pub mod rule;
mod types;

pub use encash::{EncashmentLine, EncashmentRecord, compute_encashment};
pub use entry::{Entry, Timer, duration_seconds_between};
pub use error::EngineError;
pub use report::{
    LeaveBalance, LeaveDeduction, LeavePolicy, MonthlyReport, ReportRow, month_range,
    reconcile_month,
};
pub use rule::{Holiday, IdealHours, WorkRule, applicable_holiday_dates, compute_ideal_hours};
pub use types::{
    EntryId, HolidayKind, LeaveType, ProjectId, Role, UserId, ValidationError, WorkspaceId,
};
