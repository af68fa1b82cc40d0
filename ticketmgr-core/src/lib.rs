//! ticketmgr core - client service layer for the ticketmgr backend
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: entities, events, outcomes, TOTP codes
//! - **ports**: traits for external dependencies (Transport, SecretStore, EventSink)
//! - **services**: the backend facade, local secret handling, event logging
//! - **adapters**: concrete implementations (reqwest + CSRF, DuckDB, memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb_store::DuckDbSecretStore;
use adapters::http::HttpTransport;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, TransportError};
pub use domain::{
    Credential, EntityDetail, EntityKind, Event, Failure, LoginOutcome, NewEvent, Outcome,
    Registration, TicketCheck, TicketCode,
};

/// Main context for ticketmgr operations
///
/// Holds the configuration and every service, wired to the backend named
/// in the settings and to the stores in the data directory.
pub struct TicketmgrContext {
    pub config: Config,
    pub tickets: TicketService<HttpTransport>,
    pub secrets: TotpSecretService,
    pub logging: Arc<LoggingService>,
}

impl TicketmgrContext {
    /// Create a context from the settings in `data_dir`
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config, entry_point)
    }

    /// Create a context with an already loaded configuration
    pub fn with_config(data_dir: &Path, config: Config, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let logging = Arc::new(LoggingService::new(
            data_dir,
            entry_point,
            env!("CARGO_PKG_VERSION"),
        )?);

        let store = DuckDbSecretStore::open(data_dir, config.secret_passphrase.as_deref())
            .context("Failed to open secret store")?;
        let secrets = TotpSecretService::new(Arc::new(store));

        let transport = HttpTransport::new(&config.api)?;
        let tickets = TicketService::new(transport).with_sink(logging.clone());

        Ok(Self {
            config,
            tickets,
            secrets,
            logging,
        })
    }
}
