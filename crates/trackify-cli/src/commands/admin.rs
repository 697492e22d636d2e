//! Workspace administration: rules, holidays, memberships, balances.

use std::collections::HashSet;
use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use trackify_core::rule::weekday_from_name;
use trackify_core::{Holiday, HolidayKind, LeaveType, Role, UserId, WorkRule, WorkspaceId};
use trackify_db::Database;

pub fn rule_set<W: Write>(
    writer: &mut W,
    db: &Database,
    workspace: &str,
    hours_per_day: f64,
    days: &[String],
    overtime: bool,
) -> Result<()> {
    let workspace = WorkspaceId::new(workspace)?;
    let mut week_days = HashSet::new();
    for day in days {
        week_days.insert(weekday_from_name(day)?);
    }

    let rule = WorkRule {
        workspace_id: workspace.clone(),
        working_hours_per_day: hours_per_day,
        working_days_per_week: u8::try_from(week_days.len()).unwrap_or(u8::MAX),
        week_days,
        is_overtime_enabled: overtime,
        is_active: true,
        created_at: Utc::now(),
    };

    // Previous rules stay as history; only the newest active one applies.
    let retired = db.deactivate_rules(&workspace)?;
    let id = db.insert_rule(&rule)?;
    tracing::debug!(retired, id, "rule replaced");
    writeln!(writer, "Set rule for {workspace}: {hours_per_day}h/day, {} days/week", rule.working_days_per_week)?;
    Ok(())
}

pub fn holiday_add<W: Write>(
    writer: &mut W,
    db: &Database,
    workspace: &str,
    date: &str,
    title: &str,
    kind: &str,
    user: Option<&str>,
) -> Result<()> {
    let workspace = WorkspaceId::new(workspace)?;
    let holiday = Holiday {
        workspace_id: workspace.clone(),
        user_id: user.map(UserId::new).transpose()?,
        date: super::util::parse_date(date)?,
        title: title.to_string(),
        kind: kind.parse::<HolidayKind>()?,
        is_active: true,
    };

    db.add_holiday(&holiday)?;
    writeln!(writer, "Added holiday '{title}' on {date} to {workspace}")?;
    Ok(())
}

pub fn member_add<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &str,
    workspace: &str,
    role: &str,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workspace = WorkspaceId::new(workspace)?;
    let role = role.parse::<Role>()?;

    db.add_member(&user, &workspace, role)?;
    writeln!(writer, "Added {user} to {workspace} as {role}")?;
    Ok(())
}

pub fn balance_set<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &str,
    workspace: &str,
    leave_type: &str,
    hours: f64,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workspace = WorkspaceId::new(workspace)?;
    let leave_type = leave_type.parse::<LeaveType>()?;

    db.set_leave_balance(&user, &workspace, leave_type, hours)?;
    writeln!(writer, "Set {leave_type} balance for {user} in {workspace} to {hours}h")?;
    Ok(())
}
