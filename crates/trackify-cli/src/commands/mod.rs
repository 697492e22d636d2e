//! Command implementations.
//!
//! Each command takes a writer so tests can capture output.

pub mod admin;
pub mod encash;
pub mod entries;
pub mod migrate;
pub mod report;
pub mod status;
pub mod timer;
pub mod util;
