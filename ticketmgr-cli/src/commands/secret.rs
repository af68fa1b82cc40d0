//! Secret commands - manage locally stored ticket secrets

use anyhow::{bail, Result};
use clap::Subcommand;
use uuid::Uuid;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Store a ticket secret for an event
    Save {
        /// Event uuid
        event_uuid: Uuid,
        /// Ticket secret
        secret: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the stored secret for an event
    Get {
        /// Event uuid
        event_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the stored secret for an event
    Remove {
        /// Event uuid
        event_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: SecretCommands) -> Result<()> {
    let ctx = get_context("secret")?;

    match command {
        SecretCommands::Save {
            event_uuid,
            secret,
            json,
        } => {
            let saved = ctx.secrets.save_totp_secret(&event_uuid, &secret);
            if json {
                println!("{}", serde_json::json!({ "saved": saved }));
            } else if saved {
                output::success(&format!("Secret stored for {}", event_uuid));
            }
            if !saved {
                bail!("The {} store refused the secret", ctx.secrets.store_name());
            }
        }
        SecretCommands::Get { event_uuid, json } => {
            let secret = ctx.secrets.get_totp_secret(&event_uuid);
            if json {
                println!("{}", serde_json::json!({ "secret": secret }));
            } else {
                match secret {
                    Some(secret) => println!("{}", secret),
                    None => output::warning(&format!("No secret stored for {}", event_uuid)),
                }
            }
        }
        SecretCommands::Remove { event_uuid, json } => {
            let removed = ctx.secrets.remove_totp_secret(&event_uuid);
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else if removed {
                output::success(&format!("Secret removed for {}", event_uuid));
            } else {
                output::warning(&format!("No secret stored for {}", event_uuid));
            }
        }
    }

    Ok(())
}
