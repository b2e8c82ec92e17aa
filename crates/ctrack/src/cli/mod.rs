//! Command-line interface for ctrack.
//!
//! This module provides the CLI structure and argument parsers for the
//! `ctrack` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    parse_day, parse_interval_spec, ConfigCommand, DayCommand, LogCommand, ShowCommand,
    TitleCommand,
};

/// ctrack - Log working hours and mileage on a calendar
///
/// Each day holds one or more time intervals with optional odometer
/// readings. Totals are shown per day and per month.
#[derive(Debug, Parser)]
#[command(name = "ctrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a month with daily and monthly totals
    Show(ShowCommand),

    /// Replace a day's entry with the given intervals
    Log(LogCommand),

    /// Show one day's intervals
    Day(DayCommand),

    /// Show or change the project title
    Title(TitleCommand),

    /// List backups written before migrations
    Backups,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
