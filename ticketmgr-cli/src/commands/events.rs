//! Event commands - listing, details, rosters, creation and enrollment

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Input;
use ticketmgr_core::{EntityKind, NewEvent};
use uuid::Uuid;

use super::{get_context, maybe_start_session, report, start_session, Session};
use crate::output;

#[derive(Subcommand)]
pub enum EnrollCommands {
    /// Enroll a user in an event by username (admin session)
    User {
        /// Event uuid
        event_uuid: Uuid,
        /// Username to enroll
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a user to an event roster by user uuid
    Attendee {
        /// Event uuid
        event_uuid: Uuid,
        /// User uuid
        user_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an admin to an event
    Admin {
        /// Event uuid
        event_uuid: Uuid,
        /// Admin username
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run_list(mine: bool, session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("events")?;

    let outcome = if mine {
        let Some(username) = session.user.clone() else {
            bail!("--mine needs --user <username>");
        };
        start_session(&ctx, session).await?;
        ctx.tickets.user_events(&username).await
    } else {
        maybe_start_session(&ctx, session).await?;
        ctx.tickets.event_list().await
    };

    report(outcome, json, "Event listing", |events| {
        if events.is_empty() {
            println!("No events found.");
        } else {
            println!("{}", output::events_table(events));
        }
    })
}

pub async fn run_show(event_uuid: Uuid, session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("event")?;
    maybe_start_session(&ctx, session).await?;

    let outcome = ctx.tickets.event_details(&event_uuid).await;
    report(outcome, json, "Event lookup", output::print_event)
}

pub async fn run_roster(event_uuid: Uuid, kind: &str, session: &Session, json: bool) -> Result<()> {
    let kind: EntityKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    let ctx = get_context("roster")?;
    maybe_start_session(&ctx, session).await?;

    let outcome = ctx
        .tickets
        .event_registered_entity_list(&event_uuid, kind)
        .await;
    report(outcome, json, "Roster lookup", |entities| {
        if entities.is_empty() {
            println!("No {}s registered.", kind);
        } else {
            println!("{}", output::entities_table(entities));
        }
    })
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("Invalid datetime '{}'. Use RFC 3339, e.g. 2030-05-01T20:00:00Z", value))
}

pub async fn run_create(
    title: Option<String>,
    description: Option<String>,
    datetime: Option<String>,
    session: &Session,
    json: bool,
) -> Result<()> {
    let title = match title {
        Some(t) => t,
        None => Input::new().with_prompt("Title").interact_text()?,
    };
    let description = match description {
        Some(d) => d,
        None => Input::new()
            .with_prompt("Description")
            .allow_empty(true)
            .interact_text()?,
    };
    let datetime = match datetime {
        Some(d) => d,
        None => Input::new()
            .with_prompt("Starts at (RFC 3339)")
            .interact_text()?,
    };
    let datetime = parse_datetime(&datetime)?;

    let ctx = get_context("create-event")?;
    start_session(&ctx, session).await?;

    let outcome = ctx
        .tickets
        .create_new_event(&NewEvent::new(title, description, datetime))
        .await;
    report(outcome, json, "Event creation", |event| {
        output::success("Event created");
        output::print_event(event);
    })
}

pub async fn run_enroll(command: EnrollCommands, session: &Session) -> Result<()> {
    let ctx = get_context("enroll")?;
    start_session(&ctx, session).await?;

    match command {
        EnrollCommands::User {
            event_uuid,
            username,
            json,
        } => {
            let outcome = ctx.tickets.enroll_user_in_event(&username, &event_uuid).await;
            report(outcome, json, "Enrollment", |event| {
                output::success(&format!("Enrolled {} in {}", username, event.title.bold()));
            })
        }
        EnrollCommands::Attendee {
            event_uuid,
            user_uuid,
            json,
        } => {
            let outcome = ctx.tickets.add_user_to_event(&event_uuid, &user_uuid).await;
            report(outcome, json, "Enrollment", |detail| {
                output::success(&format!("Added {} to the event", detail.profile().username));
            })
        }
        EnrollCommands::Admin {
            event_uuid,
            username,
            json,
        } => {
            let outcome = ctx.tickets.add_admin_to_event(&event_uuid, &username).await;
            report(outcome, json, "Enrollment", |detail| {
                output::success(&format!("{} now administers the event", detail.profile().username));
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2022-12-01T08:12:46.787312Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2022-12-01T08:12:46.787312+00:00");

        let shifted = parse_datetime("2030-05-01T22:00:00+02:00").unwrap();
        assert_eq!(shifted.format("%H:%M").to_string(), "20:00");

        assert!(parse_datetime("tomorrow").is_err());
    }
}
