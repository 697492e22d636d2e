//! Workspace policy records: rules, holidays, memberships and leave balances.

use std::collections::HashSet;

use chrono::{NaiveDate, Weekday};
use rusqlite::{OptionalExtension, params};
use trackify_core::{
    Holiday, HolidayKind, LeaveBalance, LeaveType, Role, UserId, ValidationError, WorkRule,
    WorkspaceId,
};
use trackify_core::rule::{weekday_from_name, weekday_name};
use uuid::Uuid;

use crate::{Database, DbError, format_timestamp, parse_date, parse_timestamp};

/// Canonical JSON form of a rule's weekday set: lowercase full names,
/// Monday first, no duplicates.
pub(crate) fn week_days_json(days: &HashSet<Weekday>) -> Result<String, DbError> {
    let mut days: Vec<Weekday> = days.iter().copied().collect();
    days.sort_by_key(Weekday::num_days_from_monday);
    let names: Vec<&str> = days.into_iter().map(weekday_name).collect();
    serde_json::to_string(&names).map_err(|err| DbError::InvalidRecord {
        record_id: "rule week days".to_string(),
        message: err.to_string(),
    })
}

pub(crate) fn week_days_from_json(
    json: &str,
    record_id: &str,
) -> Result<HashSet<Weekday>, DbError> {
    let names: Vec<String> =
        serde_json::from_str(json).map_err(|err| DbError::InvalidRecord {
            record_id: record_id.to_string(),
            message: err.to_string(),
        })?;
    let mut days = HashSet::new();
    for name in names {
        days.insert(weekday_from_name(&name)?);
    }
    Ok(days)
}

impl Database {
    /// Inserts a working-hours rule, returning its generated ID.
    ///
    /// Existing rules are left in place; [`Database::active_rule`] resolves
    /// ties by picking the most recently created active rule.
    pub fn insert_rule(&self, rule: &WorkRule) -> Result<String, DbError> {
        rule.validate()?;
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO rules
            (id, workspace_id, working_hours_per_day, working_days_per_week,
             week_days, is_overtime_enabled, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                rule.workspace_id.as_str(),
                rule.working_hours_per_day,
                i64::from(rule.working_days_per_week),
                week_days_json(&rule.week_days)?,
                i64::from(rule.is_overtime_enabled),
                i64::from(rule.is_active),
                format_timestamp(rule.created_at),
            ],
        )?;
        Ok(id)
    }

    /// Resolves the workspace's active rule, newest first.
    ///
    /// Returns `None` when no active rule exists; callers fall back to
    /// [`WorkRule::default_for`].
    pub fn active_rule(&self, workspace: &WorkspaceId) -> Result<Option<WorkRule>, DbError> {
        let row: Option<(String, f64, i64, String, i64, String)> = self
            .conn
            .query_row(
                "
                SELECT id, working_hours_per_day, working_days_per_week,
                       week_days, is_overtime_enabled, created_at
                FROM rules
                WHERE workspace_id = ? AND is_active = 1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                ",
                [workspace.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, hours, days_per_week, week_days, overtime, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(WorkRule {
            workspace_id: workspace.clone(),
            working_hours_per_day: hours,
            working_days_per_week: u8::try_from(days_per_week).map_err(|_| {
                DbError::InvalidRecord {
                    record_id: id.clone(),
                    message: format!("working_days_per_week out of range: {days_per_week}"),
                }
            })?,
            week_days: week_days_from_json(&week_days, &id)?,
            is_overtime_enabled: overtime != 0,
            is_active: true,
            created_at: parse_timestamp(&created_at, &id)?,
        }))
    }

    /// Marks all of a workspace's rules inactive.
    pub fn deactivate_rules(&self, workspace: &WorkspaceId) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE rules SET is_active = 0 WHERE workspace_id = ? AND is_active = 1",
            [workspace.as_str()],
        )?;
        Ok(changed)
    }

    /// Inserts a holiday, returning its generated ID.
    pub fn add_holiday(&self, holiday: &Holiday) -> Result<String, DbError> {
        if holiday.title.is_empty() {
            return Err(ValidationError::Empty {
                field: "holiday title",
            }
            .into());
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO holidays (id, workspace_id, user_id, date, title, kind, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                holiday.workspace_id.as_str(),
                holiday.user_id.as_ref().map(UserId::as_str),
                holiday.date.to_string(),
                holiday.title,
                holiday.kind.as_str(),
                i64::from(holiday.is_active),
            ],
        )?;
        Ok(id)
    }

    /// Lists a workspace's holidays whose date falls in the inclusive range.
    ///
    /// Both active and inactive records are returned; applicability per
    /// user is decided by [`Holiday::applies_to`].
    pub fn holidays_in_range(
        &self,
        workspace: &WorkspaceId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Holiday>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, date, title, kind, is_active
            FROM holidays
            WHERE workspace_id = ? AND date >= ? AND date <= ?
            ORDER BY date ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![workspace.as_str(), from.to_string(), to.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )?;
        let mut holidays = Vec::new();
        for row in rows {
            let (id, user_id, date, title, kind, is_active) = row?;
            holidays.push(Holiday {
                workspace_id: workspace.clone(),
                user_id: user_id.map(UserId::new).transpose()?,
                date: parse_date(&date, &id)?,
                title,
                kind: kind.parse::<HolidayKind>()?,
                is_active: is_active != 0,
            });
        }
        Ok(holidays)
    }

    /// Adds or replaces a workspace membership.
    pub fn add_member(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        role: Role,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO memberships (user_id, workspace_id, role)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, workspace_id) DO UPDATE SET role = excluded.role
            ",
            params![user.as_str(), workspace.as_str(), role.as_str()],
        )?;
        Ok(())
    }

    /// Returns a user's role in a workspace, if they are a member.
    pub fn membership_role(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Option<Role>, DbError> {
        let role: Option<String> = self
            .conn
            .query_row(
                "SELECT role FROM memberships WHERE user_id = ? AND workspace_id = ?",
                params![user.as_str(), workspace.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        role.map(|value| value.parse::<Role>().map_err(DbError::from))
            .transpose()
    }

    /// Sets a user's available balance for one leave type, in hours.
    pub fn set_leave_balance(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        leave_type: LeaveType,
        available_hours: f64,
    ) -> Result<(), DbError> {
        if available_hours < 0.0 || available_hours.is_nan() {
            return Err(ValidationError::NegativeHours {
                value: available_hours,
            }
            .into());
        }
        self.conn.execute(
            "
            INSERT INTO leave_balances (user_id, workspace_id, leave_type, available_hours)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, workspace_id, leave_type)
                DO UPDATE SET available_hours = excluded.available_hours
            ",
            params![
                user.as_str(),
                workspace.as_str(),
                leave_type.as_str(),
                available_hours
            ],
        )?;
        Ok(())
    }

    /// Lists a user's leave balances ordered by leave type name.
    pub fn leave_balances(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
    ) -> Result<Vec<LeaveBalance>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT leave_type, available_hours
            FROM leave_balances
            WHERE user_id = ? AND workspace_id = ?
            ORDER BY leave_type ASC
            ",
        )?;
        let rows = stmt.query_map(params![user.as_str(), workspace.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut balances = Vec::new();
        for row in rows {
            let (leave_type, available_hours) = row?;
            balances.push(LeaveBalance {
                leave_type: leave_type.parse::<LeaveType>()?,
                available_hours,
            });
        }
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn workspace() -> WorkspaceId {
        WorkspaceId::new("acme").unwrap()
    }

    fn rule_created_at(hour: u32) -> WorkRule {
        WorkRule::default_for(
            workspace(),
            Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
        )
    }

    #[test]
    fn active_rule_resolution_prefers_newest() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.active_rule(&workspace()).unwrap().is_none());

        let mut older = rule_created_at(8);
        older.working_hours_per_day = 6.0;
        db.insert_rule(&older).unwrap();

        let mut newer = rule_created_at(12);
        newer.working_hours_per_day = 7.5;
        db.insert_rule(&newer).unwrap();

        let resolved = db.active_rule(&workspace()).unwrap().unwrap();
        assert!((resolved.working_hours_per_day - 7.5).abs() < f64::EPSILON);
        assert_eq!(resolved.week_days.len(), 5);
        assert!(resolved.is_overtime_enabled);
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let db = Database::open_in_memory().unwrap();

        let mut rule = rule_created_at(8);
        rule.is_active = false;
        db.insert_rule(&rule).unwrap();
        assert!(db.active_rule(&workspace()).unwrap().is_none());

        db.insert_rule(&rule_created_at(9)).unwrap();
        assert!(db.active_rule(&workspace()).unwrap().is_some());

        db.deactivate_rules(&workspace()).unwrap();
        assert!(db.active_rule(&workspace()).unwrap().is_none());
    }

    #[test]
    fn insert_rule_validates_policy() {
        let db = Database::open_in_memory().unwrap();
        let mut rule = rule_created_at(8);
        rule.working_hours_per_day = -2.0;
        assert!(db.insert_rule(&rule).is_err());
    }

    #[test]
    fn week_days_json_is_canonical() {
        let days = HashSet::from([Weekday::Fri, Weekday::Mon, Weekday::Wed]);
        let json = week_days_json(&days).unwrap();
        assert_eq!(json, r#"["monday","wednesday","friday"]"#);

        let parsed = week_days_from_json(&json, "rule-1").unwrap();
        assert_eq!(parsed, days);
    }

    #[test]
    fn week_days_from_json_accepts_legacy_names() {
        let parsed = week_days_from_json(r#"["Monday","TUE","wed"]"#, "rule-1").unwrap();
        assert_eq!(
            parsed,
            HashSet::from([Weekday::Mon, Weekday::Tue, Weekday::Wed])
        );
        assert!(week_days_from_json(r#"["noday"]"#, "rule-1").is_err());
    }

    #[test]
    fn holidays_roundtrip_through_storage() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new("alice").unwrap();

        let holiday = Holiday {
            workspace_id: workspace(),
            user_id: None,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            title: "New Year".to_string(),
            kind: HolidayKind::Gazetted,
            is_active: true,
        };
        db.add_holiday(&holiday).unwrap();

        let personal = Holiday {
            workspace_id: workspace(),
            user_id: Some(alice.clone()),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            title: "Personal day".to_string(),
            kind: HolidayKind::Restricted,
            is_active: true,
        };
        db.add_holiday(&personal).unwrap();

        let listed = db
            .holidays_in_range(
                &workspace(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], holiday);
        assert_eq!(listed[1], personal);

        // Out-of-range dates are excluded.
        let empty = db
            .holidays_in_range(
                &workspace(),
                NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            )
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn holiday_title_must_be_present() {
        let db = Database::open_in_memory().unwrap();
        let holiday = Holiday {
            workspace_id: workspace(),
            user_id: None,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            title: String::new(),
            kind: HolidayKind::Gazetted,
            is_active: true,
        };
        assert!(db.add_holiday(&holiday).is_err());
    }

    #[test]
    fn membership_roundtrip_and_upsert() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new("alice").unwrap();

        assert!(db.membership_role(&alice, &workspace()).unwrap().is_none());

        db.add_member(&alice, &workspace(), Role::Member).unwrap();
        assert_eq!(
            db.membership_role(&alice, &workspace()).unwrap(),
            Some(Role::Member)
        );

        db.add_member(&alice, &workspace(), Role::Admin).unwrap();
        assert_eq!(
            db.membership_role(&alice, &workspace()).unwrap(),
            Some(Role::Admin)
        );
    }

    #[test]
    fn leave_balances_upsert_and_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new("alice").unwrap();

        db.set_leave_balance(&alice, &workspace(), LeaveType::Sick, 24.0)
            .unwrap();
        db.set_leave_balance(&alice, &workspace(), LeaveType::Casual, 40.0)
            .unwrap();
        db.set_leave_balance(&alice, &workspace(), LeaveType::Casual, 32.0)
            .unwrap();

        let balances = db.leave_balances(&alice, &workspace()).unwrap();
        assert_eq!(balances.len(), 2);
        // Ordered by leave type name: casual before sick.
        assert_eq!(balances[0].leave_type, LeaveType::Casual);
        assert!((balances[0].available_hours - 32.0).abs() < f64::EPSILON);
        assert_eq!(balances[1].leave_type, LeaveType::Sick);
    }

    #[test]
    fn negative_balance_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new("alice").unwrap();
        assert!(
            db.set_leave_balance(&alice, &workspace(), LeaveType::Casual, -1.0)
                .is_err()
        );
    }
}
