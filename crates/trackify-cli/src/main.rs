use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trackify_cli::commands::{admin, encash, entries, migrate, report, status, timer};
use trackify_cli::{BalanceAction, Cli, Commands, Config, HolidayAction, MemberAction, RuleAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(trackify_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = trackify_db::Database::open(&config.database_path)
        .context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init avoids a panic if tracing is already initialized (e.g. in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Commands::Start {
            user,
            workspace,
            project,
            title,
            billable,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            timer::start(&mut stdout, &mut db, user, workspace, project, title, *billable)?;
        }
        Some(Commands::Stop { user }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            timer::stop(&mut stdout, &mut db, user)?;
        }
        Some(Commands::Status { user }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, user.as_deref())?;
        }
        Some(Commands::Entries {
            user,
            workspace,
            from,
            to,
            json,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            entries::list(
                &mut stdout,
                &db,
                user,
                workspace,
                from.as_deref(),
                to.as_deref(),
                *json,
            )?;
        }
        Some(Commands::Edit {
            entry,
            start,
            end,
            title,
            project,
            billable,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let args = entries::EditArgs {
                start: start.clone(),
                end: end.clone(),
                title: title.clone(),
                project: project.clone(),
                billable: *billable,
            };
            entries::edit(&mut stdout, &mut db, entry, &args)?;
        }
        Some(Commands::Delete { entry }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            entries::delete(&mut stdout, &mut db, entry)?;
        }
        Some(Commands::IdealHours {
            workspace,
            user,
            from,
            to,
            json,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::ideal_hours(&mut stdout, &db, workspace, user, from, to, *json)?;
        }
        Some(Commands::Report {
            workspace,
            user,
            month,
            year,
            json,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            report::run(&mut stdout, &mut db, workspace, user, *month, *year, *json)?;
        }
        Some(Commands::Encash {
            user,
            workspace,
            by,
            json,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            encash::run(&mut stdout, &mut db, user, workspace, by.as_deref(), *json)?;
        }
        Some(Commands::Rule { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                RuleAction::Set {
                    workspace,
                    hours_per_day,
                    days,
                    overtime,
                } => {
                    admin::rule_set(&mut stdout, &db, workspace, *hours_per_day, days, *overtime)?;
                }
            }
        }
        Some(Commands::Holiday { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                HolidayAction::Add {
                    workspace,
                    date,
                    title,
                    kind,
                    user,
                } => {
                    admin::holiday_add(
                        &mut stdout,
                        &db,
                        workspace,
                        date,
                        title,
                        kind,
                        user.as_deref(),
                    )?;
                }
            }
        }
        Some(Commands::Member { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                MemberAction::Add {
                    user,
                    workspace,
                    role,
                } => {
                    admin::member_add(&mut stdout, &db, user, workspace, role)?;
                }
            }
        }
        Some(Commands::Balance { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                BalanceAction::Set {
                    user,
                    workspace,
                    leave_type,
                    hours,
                } => {
                    admin::balance_set(&mut stdout, &db, user, workspace, leave_type, *hours)?;
                }
            }
        }
        Some(Commands::Migrate) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            migrate::run(&mut stdout, &mut db)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
