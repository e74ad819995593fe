//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::PaymentStatus;

/// Find command arguments.
#[derive(Debug, Args)]
pub struct FindCommand {
    /// Full name, matched ignoring case
    pub name: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Part of the name to look for
    pub query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Full name
    #[arg(short, long)]
    pub name: String,

    /// Mobile phone number
    #[arg(short, long)]
    pub phone: String,
}

/// Confirm command arguments.
#[derive(Debug, Args)]
pub struct ConfirmCommand {
    /// Attendee's full name
    pub name: String,

    /// Proof of payment (csv, png, jpg or pdf)
    pub file: PathBuf,

    /// MIME type of the file; derived from the extension when omitted
    #[arg(short, long)]
    pub mime: Option<String>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show attendees with this payment status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusFilter>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Payment status argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    /// Waiting for a proof of payment
    Pending,
    /// Payment confirmed
    Confirmed,
}

impl From<StatusFilter> for PaymentStatus {
    fn from(arg: StatusFilter) -> Self {
        match arg {
            StatusFilter::Pending => Self::Pendente,
            StatusFilter::Confirmed => Self::Confirmado,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
