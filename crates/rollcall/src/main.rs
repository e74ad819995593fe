//! `rollcall` - CLI for the attendance registry
//!
//! This binary is the desk front end: it looks attendees up, registers
//! newcomers, and confirms payments by storing proof files.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use rollcall::cli::{
    error_report, Cli, Command, ConfigCommand, ConfirmCommand, ListCommand, OutputFormat,
    RegisterCommand,
};
use rollcall::{init_logging, AttendeeRecord, Config, PaymentStatus, ProofKind, RegistrationDesk};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", error_report(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Find(cmd) => {
            let desk = open_desk(&config)?;
            match desk.store().find(&cmd.name) {
                Some(record) => print_records(&[record], cmd.format)?,
                None => println!("No attendee named \"{}\".", cmd.name.trim()),
            }
            Ok(())
        }
        Command::Search(cmd) => {
            let desk = open_desk(&config)?;
            let results = desk.lookup(&cmd.query);
            if results.is_empty() && cmd.format != OutputFormat::Json {
                println!("No attendees match \"{}\".", cmd.query.trim());
                return Ok(());
            }
            print_records(&results, cmd.format)
        }
        Command::Register(cmd) => handle_register(&config, &cmd),
        Command::Confirm(cmd) => handle_confirm(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_desk(config: &Config) -> Result<RegistrationDesk> {
    RegistrationDesk::open(config).with_context(|| {
        format!(
            "opening attendee table {}",
            config.table_path().display()
        )
    })
}

fn handle_register(config: &Config, cmd: &RegisterCommand) -> Result<()> {
    let desk = open_desk(config)?;
    let record = desk.register(&cmd.name, &cmd.phone)?;
    println!("Registered {} ({}).", record.name, record.status);
    Ok(())
}

fn handle_confirm(config: &Config, cmd: &ConfirmCommand) -> Result<()> {
    let desk = open_desk(config)?;

    let file_name = cmd
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file path", cmd.file.display()))?;
    let mime = cmd.mime.clone().unwrap_or_else(|| {
        ProofKind::from_file_name(&file_name)
            .map(|kind| kind.default_mime().to_string())
            .unwrap_or_default()
    });

    // Reject by size before reading the whole file into memory.
    let size = std::fs::metadata(&cmd.file)
        .with_context(|| format!("reading {}", cmd.file.display()))?
        .len();
    desk.uploads().validate(size, &file_name, &mime)?;

    let bytes =
        std::fs::read(&cmd.file).with_context(|| format!("reading {}", cmd.file.display()))?;
    let record = desk.submit_proof(&cmd.name, &bytes, &file_name, &mime)?;

    println!("Payment confirmed for {}.", record.name);
    if let Some(proof) = &record.proof_path {
        println!("Proof stored at {proof}");
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<()> {
    let desk = open_desk(config)?;
    let wanted = cmd.status.map(PaymentStatus::from);
    let records: Vec<_> = desk
        .store()
        .records()
        .into_iter()
        .filter(|r| wanted.map_or(true, |status| r.status == status))
        .collect();
    print_records(&records, cmd.format)
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let desk = open_desk(config)?;
    let stats = desk.store().stats();

    if json {
        let status = serde_json::json!({
            "table_path": desk.store().path(),
            "upload_dir": desk.uploads().dir(),
            "total": stats.total,
            "pending": stats.pending,
            "confirmed": stats.confirmed,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("rollcall status");
        println!("---------------");
        println!("Table:         {}", desk.store().path().display());
        println!("Uploads:       {}", desk.uploads().dir().display());
        println!("Attendees:     {}", stats.total);
        println!("  Pending:     {}", stats.pending);
        println!("  Confirmed:   {}", stats.confirmed);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Table path:         {}", config.table_path().display());
                println!();
                println!("[Uploads]");
                println!("  Directory:          {}", config.upload_dir().display());
                println!("  Max file size:      {} bytes", config.uploads.max_file_size);
                println!(
                    "  Allowed types:      {}",
                    config.uploads.allowed_extensions.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn print_records(records: &[AttendeeRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Plain => {
            for r in records {
                println!(
                    "{} | {} | {} | {} | {}",
                    r.name,
                    r.phone,
                    r.attendee_type,
                    r.status,
                    r.proof_path.as_deref().unwrap_or("-")
                );
            }
        }
        OutputFormat::Table => {
            let name_width = records
                .iter()
                .map(|r| r.name.chars().count())
                .max()
                .unwrap_or(0)
                .max("NAME".len());
            let phone_width = records
                .iter()
                .map(|r| r.phone.chars().count())
                .max()
                .unwrap_or(0)
                .max("PHONE".len());

            println!(
                "{:<name_width$}  {:<phone_width$}  {:<9}  STATUS",
                "NAME", "PHONE", "TYPE"
            );
            for r in records {
                println!(
                    "{:<name_width$}  {:<phone_width$}  {:<9}  {}",
                    r.name,
                    r.phone,
                    r.attendee_type.as_str(),
                    r.status
                );
            }
            println!();
            println!("{} attendee(s)", records.len());
        }
    }
    Ok(())
}
