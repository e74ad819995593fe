//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ConfirmCommand, FindCommand, ListCommand, OutputFormat, RegisterCommand,
    SearchCommand, StatusCommand, StatusFilter,
};

/// rollcall - Event attendance registry
///
/// Look attendees up by name, register newcomers, and confirm payments by
/// storing a proof file alongside the attendee table.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
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
    /// Look up one attendee by exact name
    Find(FindCommand),

    /// Search attendees whose name contains the query
    Search(SearchCommand),

    /// Register a new attendee
    Register(RegisterCommand),

    /// Store a proof of payment and confirm the attendee
    Confirm(ConfirmCommand),

    /// List attendees
    List(ListCommand),

    /// Show table location and payment counts
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Render a failed command for the terminal.
///
/// Record and upload rejections are normal outcomes at the desk and print as
/// their bare message. Anything else keeps its context chain.
#[must_use]
pub fn error_report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<crate::Error>() {
        Some(e) if e.is_user_facing() => e.to_string(),
        _ => format!("Error: {err:#}"),
    }
}
