//! CLI command implementations

pub mod account;
pub mod events;
pub mod logs;
pub mod secret;
pub mod ticket;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use dialoguer::Password;
use serde::Serialize;
use ticketmgr_core::config::default_data_dir;
use ticketmgr_core::services::EntryPoint;
use ticketmgr_core::{Credential, EntityDetail, LoginOutcome, Outcome, TicketmgrContext};

use crate::output;

/// Password for `tkt` logins
pub const PASSWORD_ENV: &str = "TICKETMGR_PASSWORD";

/// Account the command runs as, from the global `--user` / `--password`
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<String>,
    pub password: Option<String>,
}

pub fn get_data_dir() -> Result<PathBuf> {
    default_data_dir()
}

/// Build the context and record which command is running
pub fn get_context(command: &str) -> Result<TicketmgrContext> {
    let ctx = TicketmgrContext::new(&get_data_dir()?, EntryPoint::Cli)?;
    // logging should never break the command
    let _ = ctx.logging.log_command(command);
    Ok(ctx)
}

/// Get password from --password flag, TICKETMGR_PASSWORD env var, or prompt
pub fn get_password_or_prompt(password_flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p);
    }

    let p = Password::new().with_prompt(prompt).interact()?;
    Ok(p)
}

/// Log in as the session user; the backend session lives for this process
pub async fn start_session(ctx: &TicketmgrContext, session: &Session) -> Result<EntityDetail> {
    let Some(username) = session.user.clone() else {
        bail!("This command needs a session: pass --user <username>");
    };
    let password = get_password_or_prompt(session.password.clone(), "Password")?;

    match ctx.tickets.login(&Credential::new(username, password)).await {
        LoginOutcome::Entity(detail) => Ok(detail),
        LoginOutcome::Rejected(failure) => Err(anyhow!(
            "Login failed: {}",
            output::describe_failure(failure.as_ref())
        )),
        LoginOutcome::Ambiguous(_) => {
            Err(anyhow!("Login failed: account is not a user, agent or admin"))
        }
    }
}

/// Log in when `--user` was given, otherwise run anonymously
pub async fn maybe_start_session(ctx: &TicketmgrContext, session: &Session) -> Result<()> {
    if session.user.is_some() {
        start_session(ctx, session).await?;
    }
    Ok(())
}

/// Print an outcome and turn a failure into the command's error
///
/// With `json` the `[status, payload]` pair goes to stdout either way;
/// otherwise `render` shows the success payload.
pub fn report<T: Serialize>(
    outcome: Outcome<T>,
    json: bool,
    action: &str,
    render: impl FnOnce(&T),
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    match outcome {
        Outcome::Ok(value) => {
            if !json {
                render(&value);
            }
            Ok(())
        }
        Outcome::Failed(failure) => Err(anyhow!(
            "{} failed: {}",
            action,
            output::describe_failure(failure.as_ref())
        )),
    }
}
