//! ticketmgr CLI - event tickets in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod output;

use commands::account::{self, RegisterArgs};
use commands::{events, logs, secret, ticket, Session};

/// tkt - event tickets in your terminal
#[derive(Parser)]
#[command(name = "tkt", version, about, long_about = None)]
struct Cli {
    /// Log in as this account before running the command
    #[arg(long, global = true, env = "TICKETMGR_USER")]
    user: Option<String>,

    /// Password for --user (falls back to TICKETMGR_PASSWORD, then a prompt)
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    Register {
        /// Username for the new account
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and show who the backend thinks you are
    Login {
        /// Username (defaults to --user)
        username: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the backend session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show account details
    User {
        /// Username (defaults to --user)
        username: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List events
    Events {
        /// Only events the --user account is enrolled in
        #[arg(long)]
        mine: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one event
    Event {
        /// Event uuid
        event_uuid: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List accounts registered to an event
    Roster {
        /// Event uuid
        event_uuid: Uuid,
        /// Account kind: user, agent or admin
        #[arg(long, default_value = "user")]
        kind: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an event (admin session)
    CreateEvent {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Start time, RFC 3339
        #[arg(long)]
        datetime: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Put accounts on an event's roster
    Enroll {
        #[command(subcommand)]
        command: events::EnrollCommands,
    },

    /// Claim, show and verify tickets
    Ticket {
        #[command(subcommand)]
        command: ticket::TicketCommands,
    },

    /// Manage locally stored ticket secrets
    Secret {
        #[command(subcommand)]
        command: secret::SecretCommands,
    },

    /// View and manage the client event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let session = Session {
        user: cli.user,
        password: cli.password,
    };
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            json,
        } => runtime.block_on(account::run_register(RegisterArgs {
            username,
            email,
            first_name,
            last_name,
            password: session.password,
            json,
        })),
        Commands::Login { username, json } => {
            runtime.block_on(account::run_login(username, &session, json))
        }
        Commands::Logout { json } => runtime.block_on(account::run_logout(&session, json)),
        Commands::User { username, json } => {
            runtime.block_on(account::run_user(username, &session, json))
        }
        Commands::Events { mine, json } => runtime.block_on(events::run_list(mine, &session, json)),
        Commands::Event { event_uuid, json } => {
            runtime.block_on(events::run_show(event_uuid, &session, json))
        }
        Commands::Roster {
            event_uuid,
            kind,
            json,
        } => runtime.block_on(events::run_roster(event_uuid, &kind, &session, json)),
        Commands::CreateEvent {
            title,
            description,
            datetime,
            json,
        } => runtime.block_on(events::run_create(title, description, datetime, &session, json)),
        Commands::Enroll { command } => runtime.block_on(events::run_enroll(command, &session)),
        Commands::Ticket { command } => runtime.block_on(ticket::run(command, &session)),
        Commands::Secret { command } => secret::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
