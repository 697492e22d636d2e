//! Leave encashment settlements.
//!
//! Encashment converts a fraction of each unused leave balance into a
//! recorded settlement. The computation is read-only with respect to the
//! balance store: records are append-only history, and whether the store is
//! debited afterwards is the caller's decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::report::{LeaveBalance, LeaveDeduction, LeavePolicy};
use crate::types::{LeaveType, UserId, ValidationError, WorkspaceId};

/// Settlement of one leave type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncashmentLine {
    pub leave_type: LeaveType,
    pub available: f64,
    pub encashed: f64,
    pub remaining: f64,
}

/// An immutable leave encashment settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncashmentRecord {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub leaves: Vec<EncashmentLine>,
    /// Hours removed from each balance by this settlement, mirroring
    /// `leaves[..].encashed`; kept separate for downstream payroll export.
    pub deduction_detail: Vec<LeaveDeduction>,
    pub total_available: f64,
    pub total_encashable: f64,
    pub total_remaining: f64,
    pub encashed_at: DateTime<Utc>,
    pub encashed_by: Option<UserId>,
}

/// Computes an encashment settlement over the user's current balances.
///
/// Fails with a validation error when no leave type holds a positive
/// balance. Balances with zero or negative hours are skipped.
pub fn compute_encashment(
    user_id: UserId,
    workspace_id: WorkspaceId,
    balances: &[LeaveBalance],
    policy: &LeavePolicy,
    encashed_at: DateTime<Utc>,
    encashed_by: Option<UserId>,
) -> Result<EncashmentRecord, EngineError> {
    policy.validate()?;

    let mut leaves = Vec::new();
    let mut deduction_detail = Vec::new();
    for balance in balances {
        if balance.available_hours <= 0.0 {
            continue;
        }
        let encashed = balance.available_hours * policy.encashable_fraction;
        leaves.push(EncashmentLine {
            leave_type: balance.leave_type,
            available: balance.available_hours,
            encashed,
            remaining: balance.available_hours - encashed,
        });
        deduction_detail.push(LeaveDeduction {
            leave_type: balance.leave_type,
            deducted_hours: encashed,
        });
    }

    if leaves.is_empty() {
        return Err(ValidationError::NothingToEncash.into());
    }

    let total_available = leaves.iter().map(|line| line.available).sum();
    let total_encashable = leaves.iter().map(|line| line.encashed).sum();
    let total_remaining = leaves.iter().map(|line| line.remaining).sum();

    Ok(EncashmentRecord {
        user_id,
        workspace_id,
        leaves,
        deduction_detail,
        total_available,
        total_encashable,
        total_remaining,
        encashed_at,
        encashed_by,
    })
}
