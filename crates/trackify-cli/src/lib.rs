//! Trackify CLI library.
//!
//! Argument parsing, configuration and command implementations for the
//! `trackify` binary.

mod cli;
pub mod commands;
mod config;

pub use cli::{BalanceAction, Cli, Commands, HolidayAction, MemberAction, RuleAction};
pub use config::Config;
