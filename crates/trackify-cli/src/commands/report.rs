//! Ideal-hours and monthly report commands.

use std::io::Write;

use anyhow::Result;
use trackify_core::{LeavePolicy, MonthlyReport, UserId, WorkspaceId};
use trackify_db::Database;

use super::util::{format_hours, parse_date};

pub fn ideal_hours<W: Write>(
    writer: &mut W,
    db: &Database,
    workspace: &str,
    user: &str,
    from: &str,
    to: &str,
    json: bool,
) -> Result<()> {
    let workspace = WorkspaceId::new(workspace)?;
    let user = UserId::new(user)?;
    let from = parse_date(from)?;
    let to = parse_date(to)?;

    let ideal = db.ideal_hours(&workspace, &user, from, to)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&ideal)?)?;
        return Ok(());
    }
    writeln!(
        writer,
        "Ideal hours {from} to {to}: {} over {} working days",
        format_hours(ideal.total_hours),
        ideal.total_days
    )?;
    Ok(())
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    workspace: &str,
    user: &str,
    month: u32,
    year: i32,
    json: bool,
) -> Result<()> {
    let workspace = WorkspaceId::new(workspace)?;
    let user = UserId::new(user)?;

    let report = db.generate_monthly_report(&workspace, &user, month, year, &LeavePolicy::default())?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    write_report(writer, &report)?;
    Ok(())
}

fn write_report<W: Write>(writer: &mut W, report: &MonthlyReport) -> Result<()> {
    let row = &report.row;
    writeln!(
        writer,
        "Report for {} in {} ({}-{:02})",
        report.user_id, report.workspace_id, report.year, report.month
    )?;
    writeln!(writer, "Ideal:     {}", format_hours(report.ideal_monthly_hours))?;
    writeln!(writer, "Worked:    {}", format_hours(row.worked_hours))?;
    writeln!(writer, "Overtime:  {}", format_hours(row.overtime))?;
    writeln!(writer, "Undertime: {}", format_hours(row.undertime))?;
    writeln!(writer, "Days worked: {}", row.dates_worked.len())?;
    if !row.undertime_deductions.is_empty() {
        writeln!(writer, "Leave deductions:")?;
        for deduction in &row.undertime_deductions {
            writeln!(
                writer,
                "- {}: {}",
                deduction.leave_type,
                format_hours(deduction.deducted_hours)
            )?;
        }
    }
    if row.unpaid_leaves > 0.0 {
        writeln!(writer, "Unpaid leave: {}", format_hours(row.unpaid_leaves))?;
    }
    Ok(())
}
