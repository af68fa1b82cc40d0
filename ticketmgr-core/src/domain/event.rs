//! Event domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// An event as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub description: String,
    pub datetime: DateTime<Utc>,
    pub uuid: Uuid,
    /// Fields the client does not interpret (row id, ...)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Event {
    /// Whether the event starts after `now`
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.datetime > now
    }
}

/// Payload for creating an event; the backend assigns the uuid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub datetime: DateTime<Utc>,
}

impl NewEvent {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            datetime,
        }
    }
}

/// Ticket-authority verdict for a presented TOTP code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCheck {
    pub ticket_is_valid: bool,
}
