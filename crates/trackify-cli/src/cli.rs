//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Time accounting engine.
///
/// Tracks time entries against workspace working-hour rules and reconciles
/// them into monthly overtime/undertime reports with leave deductions.
#[derive(Debug, Parser)]
#[command(name = "trackify", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timer, opening a new entry.
    Start {
        /// User the timer belongs to.
        #[arg(long)]
        user: String,

        /// Workspace to log the entry in.
        #[arg(long)]
        workspace: String,

        /// Project the entry belongs to.
        #[arg(long)]
        project: String,

        /// Entry title.
        #[arg(long)]
        title: String,

        /// Mark the entry as billable.
        #[arg(long)]
        billable: bool,
    },

    /// Stop the user's running timer, closing its entry.
    Stop {
        #[arg(long)]
        user: String,
    },

    /// Show running timers; with --user, that user's timer state.
    Status {
        #[arg(long)]
        user: Option<String>,
    },

    /// List a user's entries in a workspace.
    Entries {
        #[arg(long)]
        user: String,

        #[arg(long)]
        workspace: String,

        /// Only entries starting on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Only entries starting before this date (YYYY-MM-DD, exclusive).
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Edit a closed entry's fields.
    Edit {
        /// Entry ID to edit.
        entry: String,

        /// New start time (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// New end time (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        project: Option<String>,

        /// Set or clear the billable flag.
        #[arg(long)]
        billable: Option<bool>,
    },

    /// Delete a closed entry.
    Delete {
        /// Entry ID to delete.
        entry: String,
    },

    /// Compute ideal working hours over a date range.
    IdealHours {
        #[arg(long)]
        workspace: String,

        #[arg(long)]
        user: String,

        /// Range start (YYYY-MM-DD, inclusive).
        #[arg(long)]
        from: String,

        /// Range end (YYYY-MM-DD, inclusive).
        #[arg(long)]
        to: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate and store the monthly report for a user.
    Report {
        #[arg(long)]
        workspace: String,

        #[arg(long)]
        user: String,

        /// Month number, 1-12.
        #[arg(long)]
        month: u32,

        #[arg(long)]
        year: i32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Encash a user's unused leave balances.
    Encash {
        #[arg(long)]
        user: String,

        #[arg(long)]
        workspace: String,

        /// Acting user recorded on the settlement.
        #[arg(long)]
        by: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage workspace working-hours rules.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Manage workspace holidays.
    Holiday {
        #[command(subcommand)]
        action: HolidayAction,
    },

    /// Manage workspace memberships.
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Manage leave balances.
    Balance {
        #[command(subcommand)]
        action: BalanceAction,
    },

    /// Run data repair migrations.
    Migrate,
}

#[derive(Debug, Subcommand)]
pub enum RuleAction {
    /// Replace the workspace's active rule.
    Set {
        #[arg(long)]
        workspace: String,

        /// Working hours per day.
        #[arg(long)]
        hours_per_day: f64,

        /// Working day names (e.g. monday), repeatable.
        #[arg(long = "day", required = true)]
        days: Vec<String>,

        /// Count hours beyond the ideal as overtime.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        overtime: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum HolidayAction {
    /// Add a holiday to a workspace calendar.
    Add {
        #[arg(long)]
        workspace: String,

        /// Holiday date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        #[arg(long)]
        title: String,

        /// Holiday kind: gazetted or restricted.
        #[arg(long, default_value = "gazetted")]
        kind: String,

        /// Restrict the holiday to one user instead of the whole workspace.
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MemberAction {
    /// Add a user to a workspace.
    Add {
        #[arg(long)]
        user: String,

        #[arg(long)]
        workspace: String,

        /// Membership role: admin or member.
        #[arg(long, default_value = "member")]
        role: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum BalanceAction {
    /// Set a user's available hours for one leave type.
    Set {
        #[arg(long)]
        user: String,

        #[arg(long)]
        workspace: String,

        /// Leave type: casual, sick or earned.
        #[arg(long)]
        leave_type: String,

        /// Available hours.
        #[arg(long)]
        hours: f64,
    },
}
