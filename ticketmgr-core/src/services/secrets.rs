//! Local TOTP secret storage and ticket code generation

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::TicketCode;
use crate::ports::SecretStore;

/// Keeps ticket secrets per event and derives codes from them
///
/// Store failures are reported as `false` / `None`; callers only learn
/// whether a secret is there.
pub struct TotpSecretService {
    store: Arc<dyn SecretStore>,
}

impl TotpSecretService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Save (or replace) the secret for an event; false if the store refused it
    pub fn save_totp_secret(&self, event_uuid: &Uuid, secret: &str) -> bool {
        self.store.put(&event_uuid.to_string(), secret).is_ok()
    }

    /// Secret for an event; `None` when missing or unreadable
    pub fn get_totp_secret(&self, event_uuid: &Uuid) -> Option<String> {
        self.store.fetch(&event_uuid.to_string()).ok().flatten()
    }

    /// Remove the secret for an event; true if one was removed
    pub fn remove_totp_secret(&self, event_uuid: &Uuid) -> bool {
        self.store.delete(&event_uuid.to_string()).unwrap_or(false)
    }

    /// Code generator for the stored secret
    pub fn ticket_code(&self, event_uuid: &Uuid) -> Option<TicketCode> {
        self.get_totp_secret(event_uuid)
            .and_then(|secret| TicketCode::new(&secret).ok())
    }

    /// Current 6-digit code for an event; `None` without a usable secret
    pub fn current_code(&self, event_uuid: &Uuid) -> Option<String> {
        self.ticket_code(event_uuid)?.current().ok()
    }

    /// Secret for an event, with store errors surfaced
    pub fn try_get(&self, event_uuid: &Uuid) -> Result<Option<String>> {
        self.store.fetch(&event_uuid.to_string())
    }

    /// Check a presented code against the locally held secret
    ///
    /// `Ok(None)` when no ticket for the event is stored here.
    pub fn check_code(&self, event_uuid: &Uuid, code: &str, unix_time: u64) -> Result<Option<bool>> {
        match self.try_get(event_uuid)? {
            Some(secret) => Ok(Some(TicketCode::new(&secret)?.verify(code, unix_time))),
            None => Ok(None),
        }
    }
}
