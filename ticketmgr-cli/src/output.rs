//! Output formatting utilities

use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use ticketmgr_core::{EntityDetail, Event, Failure};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One-line description of a failed outcome's payload
pub fn describe_failure(failure: Option<&Failure>) -> String {
    match failure {
        Some(Failure::Api {
            status_code,
            message,
        }) => format!("{} (HTTP {})", message, status_code),
        Some(Failure::Body(body)) => body.to_string(),
        None => "no usable response from the backend".to_string(),
    }
}

pub fn events_table(events: &[Event]) -> Table {
    let now = Utc::now();
    let mut table = create_table();
    table.set_header(vec!["Title", "When", "Uuid", ""]);
    for event in events {
        let marker = if event.is_upcoming(now) {
            "upcoming".green().to_string()
        } else {
            "past".dimmed().to_string()
        };
        table.add_row(vec![
            event.title.clone(),
            event.datetime.format("%Y-%m-%d %H:%M UTC").to_string(),
            event.uuid.to_string(),
            marker,
        ]);
    }
    table
}

pub fn entities_table(entities: &[EntityDetail]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Kind", "Username", "Name", "Email", "Uuid"]);
    for entity in entities {
        let profile = entity.profile();
        table.add_row(vec![
            entity.kind().to_string(),
            profile.username.clone(),
            format!("{} {}", profile.first_name, profile.last_name)
                .trim()
                .to_string(),
            profile.email.clone(),
            entity.uuid().map(|u| u.to_string()).unwrap_or_default(),
        ]);
    }
    table
}

/// Key-value view of a single entity
pub fn print_entity(entity: &EntityDetail) {
    let profile = entity.profile();
    println!("{} ({})", profile.username.bold(), entity.kind());
    println!("  Name:   {} {}", profile.first_name, profile.last_name);
    println!("  Email:  {}", profile.email);
    if let Some(uuid) = entity.uuid() {
        println!("  Uuid:   {}", uuid);
    }
    if let Some(count) = entity.event_count() {
        println!("  Events: {}", count);
    }
}

pub fn print_event(event: &Event) {
    println!("{}", event.title.bold());
    println!("  When: {}", event.datetime.format("%Y-%m-%d %H:%M UTC"));
    println!("  Uuid: {}", event.uuid);
    if !event.description.is_empty() {
        println!();
        println!("{}", event.description);
    }
}
