//! Ticket commands - claim a ticket, show its code, verify a code

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use ticketmgr_core::EntityKind;
use uuid::Uuid;

use super::{get_context, maybe_start_session, report, start_session, Session};
use crate::output;

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Fetch the ticket secret for an event and keep it locally (user session)
    Claim {
        /// Event uuid
        event_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current ticket code for a claimed ticket
    Code {
        /// Event uuid
        event_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a code against a ticket claimed on this machine, offline
    Check {
        /// Event uuid
        event_uuid: Uuid,
        /// Code to check
        #[arg(long)]
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a ticket code with the backend
    Verify {
        /// Event uuid
        event_uuid: Uuid,
        /// Uuid of the ticket holder
        #[arg(long)]
        user_uuid: Uuid,
        /// Code presented by the holder
        #[arg(long)]
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: TicketCommands, session: &Session) -> Result<()> {
    match command {
        TicketCommands::Claim { event_uuid, json } => run_claim(event_uuid, session, json).await,
        TicketCommands::Code { event_uuid, json } => run_code(event_uuid, json),
        TicketCommands::Check {
            event_uuid,
            code,
            json,
        } => run_check(event_uuid, &code, json),
        TicketCommands::Verify {
            event_uuid,
            user_uuid,
            code,
            json,
        } => run_verify(event_uuid, user_uuid, &code, session, json).await,
    }
}

async fn run_claim(event_uuid: Uuid, session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("ticket claim")?;
    let me = start_session(&ctx, session).await?;
    if me.kind() != EntityKind::User {
        bail!("Only user accounts hold tickets (logged in as {})", me.kind());
    }
    let user_uuid = me
        .uuid()
        .ok_or_else(|| anyhow!("Login response carried no user uuid"))?;

    let outcome = ctx
        .tickets
        .claim_ticket(&ctx.secrets, &user_uuid, &event_uuid)
        .await;
    report(outcome, json, "Ticket claim", |_| {
        output::success("Ticket claimed; its secret is stored locally");
        output::info(&format!("Show the code with: tkt ticket code {}", event_uuid));
    })
}

fn run_code(event_uuid: Uuid, json: bool) -> Result<()> {
    let ctx = get_context("ticket code")?;

    let Some(generator) = ctx.secrets.ticket_code(&event_uuid) else {
        bail!("No ticket claimed for event {}", event_uuid);
    };
    let code = generator.current()?;
    let ttl = generator.ttl()?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "event_uuid": event_uuid, "code": code, "valid_for_secs": ttl })
        );
    } else {
        println!("{}", code.bold());
        println!("{}", format!("valid for {}s", ttl).dimmed());
    }
    Ok(())
}

fn run_check(event_uuid: Uuid, code: &str, json: bool) -> Result<()> {
    let ctx = get_context("ticket check")?;
    let now = u64::try_from(Utc::now().timestamp())?;

    let Some(valid) = ctx.secrets.check_code(&event_uuid, code, now)? else {
        bail!("No ticket claimed for event {}", event_uuid);
    };

    if json {
        println!("{}", serde_json::json!({ "event_uuid": event_uuid, "valid": valid }));
    } else if valid {
        output::success("Code matches the current ticket code");
    } else {
        output::warning("Code does not match the current ticket code");
    }
    Ok(())
}

async fn run_verify(
    event_uuid: Uuid,
    user_uuid: Uuid,
    code: &str,
    session: &Session,
    json: bool,
) -> Result<()> {
    let ctx = get_context("ticket verify")?;
    maybe_start_session(&ctx, session).await?;

    let outcome = ctx
        .tickets
        .authenticate_ticket(&user_uuid, &event_uuid, code)
        .await;
    report(outcome, json, "Ticket check", |check| {
        if check.ticket_is_valid {
            output::success("Ticket is valid");
        } else {
            output::warning("Ticket is NOT valid");
        }
    })
}
