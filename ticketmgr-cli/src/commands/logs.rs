//! Logs command - inspect and prune the client event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use ticketmgr_core::services::{EntryPoint, LogEntry, LoggingService};

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Keep entries from the last N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entry counts and where the log lives
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let log = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => list(&log, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&log, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&log, json),
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// `eventList` or `eventList (404)`
fn describe_operation(entry: &LogEntry) -> String {
    match (&entry.operation, entry.status_code) {
        (Some(op), Some(status)) => format!("{} ({})", op, status),
        (Some(op), None) => op.clone(),
        (None, Some(status)) => format!("({})", status),
        (None, None) => String::new(),
    }
}

fn list(log: &LoggingService, limit: usize, errors: bool, json: bool) -> Result<()> {
    let entries = if errors {
        log.get_errors(limit)?
    } else {
        log.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("Log is empty.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["When", "Via", "Event", "Operation", "Error"]);
    for entry in &entries {
        let error = match &entry.error_message {
            Some(message) => message.red().to_string(),
            None => String::new(),
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.entry_point.clone(),
            entry.event.clone(),
            describe_operation(entry),
            error,
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn clear(log: &LoggingService, older_than_days: i64, force: bool, json: bool) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(older_than_days);

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete log entries from before {}?",
                cutoff.format("%Y-%m-%d")
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            output::warning("Nothing deleted.");
            return Ok(());
        }
    }

    let deleted = log.delete_before(cutoff.timestamp_millis())?;
    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
    }
    Ok(())
}

fn stats(log: &LoggingService, json: bool) -> Result<()> {
    let total = log.count()?;
    let failures = log.count_errors()?;
    let path = log.db_path();
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "total_entries": total,
                "error_count": failures,
                "database_path": path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            })
        );
        return Ok(());
    }

    println!("{}", "Event log".bold());
    println!("  Entries:  {}", total);
    println!("  Failures: {}", failures);
    println!("  File:     {} ({} bytes)", path.display(), size_bytes);
    Ok(())
}
