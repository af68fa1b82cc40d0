//! Account commands - register, login, logout, user details

use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use dialoguer::{Input, Password};
use ticketmgr_core::{Credential, LoginOutcome, Registration};

use super::{get_context, get_password_or_prompt, maybe_start_session, report, Session};
use crate::output;

pub struct RegisterArgs {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub json: bool,
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

pub async fn run_register(args: RegisterArgs) -> Result<()> {
    let ctx = get_context("register")?;

    let password = match args.password.or_else(|| std::env::var(super::PASSWORD_ENV).ok()) {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let registration = Registration {
        username: args.username,
        password,
        email: prompt_if_missing(args.email, "Email")?,
        first_name: prompt_if_missing(args.first_name, "First name")?,
        last_name: prompt_if_missing(args.last_name, "Last name")?,
    };

    let outcome = ctx.tickets.register(&registration).await;
    report(outcome, args.json, "Registration", |detail| {
        output::success("Account created");
        output::print_entity(detail);
    })
}

pub async fn run_login(username: Option<String>, session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("login")?;

    let Some(username) = username.or_else(|| session.user.clone()) else {
        bail!("Pass a username or --user <username>");
    };
    let password = get_password_or_prompt(session.password.clone(), "Password")?;

    let outcome = ctx.tickets.login(&Credential::new(username, password)).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        LoginOutcome::Entity(detail) => {
            if !json {
                output::success(&format!("Logged in as {}", detail.kind()));
                output::print_entity(&detail);
            }
            Ok(())
        }
        LoginOutcome::Ambiguous(_) => {
            if !json {
                output::warning("Logged in, but the account is not a user, agent or admin");
            }
            Ok(())
        }
        LoginOutcome::Rejected(failure) => Err(anyhow!(
            "Login failed: {}",
            output::describe_failure(failure.as_ref())
        )),
    }
}

pub async fn run_logout(session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("logout")?;
    maybe_start_session(&ctx, session).await?;

    let outcome = ctx.tickets.logout().await;
    report(outcome, json, "Logout", |_| output::success("Logged out"))
}

pub async fn run_user(username: Option<String>, session: &Session, json: bool) -> Result<()> {
    let ctx = get_context("user")?;

    let Some(username) = username.or_else(|| session.user.clone()) else {
        bail!("Pass a username or --user <username>");
    };
    maybe_start_session(&ctx, session).await?;

    let outcome = ctx.tickets.entity_details(&username).await;
    report(outcome, json, "User lookup", |detail| {
        output::print_entity(detail);
        if detail.event_count() == Some(0) {
            println!("{}", "  Not enrolled in any event".dimmed());
        }
    })
}
