//! Report aggregation: monthly reconciliation and leave encashment.
//!
//! The aggregator reads the ledger and policy tables, delegates the math to
//! `trackify-core`, and persists derived artifacts: one upserted report row
//! per (workspace, user, month, year), and append-only encashment records.
//! Source entries are never mutated here.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rusqlite::{OptionalExtension, params};
use trackify_core::{
    EncashmentRecord, EngineError, IdealHours, LeavePolicy, MonthlyReport, ReportRow, UserId,
    WorkRule, WorkspaceId, applicable_holiday_dates, compute_encashment, compute_ideal_hours,
    month_range, reconcile_month,
};
use uuid::Uuid;

use crate::{Database, DbError, format_timestamp, parse_timestamp};

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl Database {
    /// Computes ideal hours for a user over an inclusive date range,
    /// resolving the workspace's active rule and holiday calendar.
    pub fn ideal_hours(
        &self,
        workspace: &WorkspaceId,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IdealHours, DbError> {
        let rule = self
            .active_rule(workspace)?
            .unwrap_or_else(|| WorkRule::default_for(workspace.clone(), Utc::now()));
        let holidays = self.holidays_in_range(workspace, from, to)?;
        let holiday_dates = applicable_holiday_dates(&holidays, user);
        Ok(compute_ideal_hours(&rule, &holiday_dates, from, to)?)
    }

    /// Generates and upserts the monthly report for one user.
    ///
    /// Fully recomputes the row from the ledger; a re-run with unchanged
    /// entries produces an identical row, so last-writer-wins is safe.
    pub fn generate_monthly_report(
        &mut self,
        workspace: &WorkspaceId,
        user: &UserId,
        month: u32,
        year: i32,
        policy: &LeavePolicy,
    ) -> Result<MonthlyReport, DbError> {
        self.generate_monthly_report_at(workspace, user, month, year, policy, Utc::now())
    }

    pub(crate) fn generate_monthly_report_at(
        &mut self,
        workspace: &WorkspaceId,
        user: &UserId,
        month: u32,
        year: i32,
        policy: &LeavePolicy,
        now: DateTime<Utc>,
    ) -> Result<MonthlyReport, DbError> {
        if self.membership_role(user, workspace)?.is_none() {
            return Err(EngineError::not_found(format!(
                "user {user} has no membership in workspace {workspace}"
            ))
            .into());
        }

        let (first, last) = month_range(year, month)?;
        let rule = self
            .active_rule(workspace)?
            .unwrap_or_else(|| WorkRule::default_for(workspace.clone(), now));
        let holidays = self.holidays_in_range(workspace, first, last)?;
        let holiday_dates = applicable_holiday_dates(&holidays, user);
        let ideal = compute_ideal_hours(&rule, &holiday_dates, first, last)?;

        let (worked_seconds, dates_worked) = self.worked_in_range(
            user,
            workspace,
            day_start(first),
            day_start(last + chrono::Duration::days(1)),
        )?;
        let balances = self.leave_balances(user, workspace)?;
        let row = reconcile_month(
            user.clone(),
            &ideal,
            worked_seconds,
            dates_worked,
            rule.is_overtime_enabled,
            &balances,
            policy,
        )?;

        let report = MonthlyReport {
            user_id: user.clone(),
            workspace_id: workspace.clone(),
            month,
            year,
            ideal_monthly_hours: ideal.total_hours,
            row,
            generated_at: now,
        };
        let row_json =
            serde_json::to_string(&report.row).map_err(|err| DbError::InvalidRecord {
                record_id: format!("report {workspace}/{user}/{year}-{month:02}"),
                message: err.to_string(),
            })?;

        // Single-statement upsert: the report is either fully replaced or
        // untouched.
        self.conn.execute(
            "
            INSERT INTO monthly_reports
            (workspace_id, user_id, month, year, ideal_monthly_hours, row_json, generated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(workspace_id, user_id, month, year) DO UPDATE SET
                ideal_monthly_hours = excluded.ideal_monthly_hours,
                row_json = excluded.row_json,
                generated_at = excluded.generated_at
            ",
            params![
                workspace.as_str(),
                user.as_str(),
                i64::from(month),
                i64::from(year),
                report.ideal_monthly_hours,
                row_json,
                format_timestamp(now),
            ],
        )?;
        tracing::debug!(
            workspace = %workspace,
            user = %user,
            month,
            year,
            worked_seconds,
            "monthly report generated"
        );
        Ok(report)
    }

    /// Sums closed-entry durations and collects worked day-of-month values
    /// for entries whose start time falls in `[from, to)`.
    fn worked_in_range(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(i64, Vec<u32>), DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, duration_seconds
            FROM entries
            WHERE user_id = ? AND workspace_id = ?
              AND end_time IS NOT NULL
              AND start_time >= ? AND start_time < ?
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                user.as_str(),
                workspace.as_str(),
                format_timestamp(from),
                format_timestamp(to),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut worked_seconds = 0;
        let mut dates_worked = Vec::new();
        for row in rows {
            let (id, start_time, duration_seconds) = row?;
            let start_time = parse_timestamp(&start_time, &id)?;
            worked_seconds += duration_seconds;
            dates_worked.push(start_time.day());
        }
        Ok((worked_seconds, dates_worked))
    }

    /// Fetches a previously generated monthly report.
    pub fn monthly_report(
        &self,
        workspace: &WorkspaceId,
        user: &UserId,
        month: u32,
        year: i32,
    ) -> Result<Option<MonthlyReport>, DbError> {
        let row: Option<(f64, String, String)> = self
            .conn
            .query_row(
                "
                SELECT ideal_monthly_hours, row_json, generated_at
                FROM monthly_reports
                WHERE workspace_id = ? AND user_id = ? AND month = ? AND year = ?
                ",
                params![
                    workspace.as_str(),
                    user.as_str(),
                    i64::from(month),
                    i64::from(year)
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((ideal_monthly_hours, row_json, generated_at)) = row else {
            return Ok(None);
        };
        let record_id = format!("report {workspace}/{user}/{year}-{month:02}");
        let report_row: ReportRow =
            serde_json::from_str(&row_json).map_err(|err| DbError::InvalidRecord {
                record_id: record_id.clone(),
                message: err.to_string(),
            })?;
        Ok(Some(MonthlyReport {
            user_id: user.clone(),
            workspace_id: workspace.clone(),
            month,
            year,
            ideal_monthly_hours,
            row: report_row,
            generated_at: parse_timestamp(&generated_at, &record_id)?,
        }))
    }

    /// Computes and appends a leave encashment settlement.
    ///
    /// Balances are read, never debited; the record is immutable history.
    pub fn encash_leaves(
        &mut self,
        user: &UserId,
        workspace: &WorkspaceId,
        policy: &LeavePolicy,
        encashed_by: Option<&UserId>,
    ) -> Result<EncashmentRecord, DbError> {
        self.encash_leaves_at(user, workspace, policy, encashed_by, Utc::now())
    }

    pub(crate) fn encash_leaves_at(
        &mut self,
        user: &UserId,
        workspace: &WorkspaceId,
        policy: &LeavePolicy,
        encashed_by: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> Result<EncashmentRecord, DbError> {
        let balances = self.leave_balances(user, workspace)?;
        let record = compute_encashment(
            user.clone(),
            workspace.clone(),
            &balances,
            policy,
            now,
            encashed_by.cloned(),
        )?;

        let id = Uuid::new_v4().to_string();
        let record_json =
            serde_json::to_string(&record).map_err(|err| DbError::InvalidRecord {
                record_id: id.clone(),
                message: err.to_string(),
            })?;
        self.conn.execute(
            "
            INSERT INTO leave_encashments (id, user_id, workspace_id, record_json, encashed_at)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                id,
                user.as_str(),
                workspace.as_str(),
                record_json,
                format_timestamp(now)
            ],
        )?;
        tracing::debug!(user = %user, workspace = %workspace, total = record.total_encashable, "leaves encashed");
        Ok(record)
    }

    /// Lists a user's encashment history, oldest first.
    pub fn encashments(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Vec<EncashmentRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, record_json
            FROM leave_encashments
            WHERE user_id = ? AND workspace_id = ?
            ORDER BY encashed_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![user.as_str(), workspace.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (id, record_json) = row?;
            records.push(serde_json::from_str(&record_json).map_err(|err| {
                DbError::InvalidRecord {
                    record_id: id,
                    message: err.to_string(),
                }
            })?);
        }
        Ok(records)
    }
}
