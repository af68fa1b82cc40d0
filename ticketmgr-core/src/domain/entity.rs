//! Ticketing entities: users, agents and admins

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Backend role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Agent,
    Admin,
}

impl EntityKind {
    /// Sniffing order for response bodies
    pub const ALL: [EntityKind; 3] = [EntityKind::User, EntityKind::Agent, EntityKind::Admin];

    /// JSON key the backend nests the profile under; also the roster path segment
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Agent => "agent",
            EntityKind::Admin => "admin",
        }
    }

    /// Infer the kind of a detail body from which top-level key it carries
    ///
    /// Returns `None` when the body is not an object or carries none of the keys.
    pub fn sniff(body: &JsonValue) -> Option<Self> {
        let object = body.as_object()?;
        Self::ALL
            .into_iter()
            .find(|kind| object.get(kind.key()).is_some_and(JsonValue::is_object))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "agent" | "agents" => Ok(EntityKind::Agent),
            "admin" | "admins" => Ok(EntityKind::Admin),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// Login credentials
#[derive(Clone, Serialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up payload; the backend only creates `User` accounts
#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Account profile shared by every entity kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// `User` as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    pub user: Profile,
    pub uuid: Uuid,
    #[serde(default)]
    pub event_count: u64,
    /// Fields the client does not interpret (row id, ...)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// `Agent` as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetail {
    pub agent: Profile,
    /// Fields the client does not interpret (row id, assigned event, ...)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// `Admin` as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminDetail {
    pub admin: Profile,
    #[serde(default)]
    pub event_count: u64,
    /// Fields the client does not interpret (row id, ...)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Detail of any entity kind; serializes back to the backend's shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityDetail {
    User(UserDetail),
    Agent(AgentDetail),
    Admin(AdminDetail),
}

impl EntityDetail {
    /// Decode a body known to describe `kind`
    pub fn decode(kind: EntityKind, body: JsonValue) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::User => EntityDetail::User(serde_json::from_value(body)?),
            EntityKind::Agent => EntityDetail::Agent(serde_json::from_value(body)?),
            EntityKind::Admin => EntityDetail::Admin(serde_json::from_value(body)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDetail::User(_) => EntityKind::User,
            EntityDetail::Agent(_) => EntityKind::Agent,
            EntityDetail::Admin(_) => EntityKind::Admin,
        }
    }

    pub fn profile(&self) -> &Profile {
        match self {
            EntityDetail::User(d) => &d.user,
            EntityDetail::Agent(d) => &d.agent,
            EntityDetail::Admin(d) => &d.admin,
        }
    }

    /// Only users carry a public uuid
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            EntityDetail::User(d) => Some(d.uuid),
            EntityDetail::Agent(_) | EntityDetail::Admin(_) => None,
        }
    }

    /// Number of events the entity is enrolled in (users and admins)
    pub fn event_count(&self) -> Option<u64> {
        match self {
            EntityDetail::User(d) => Some(d.event_count),
            EntityDetail::Admin(d) => Some(d.event_count),
            EntityDetail::Agent(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for EntityDetail {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = JsonValue::deserialize(deserializer)?;
        let kind = EntityKind::sniff(&value)
            .ok_or_else(|| D::Error::custom("expected one of 'user', 'agent' or 'admin'"))?;
        EntityDetail::decode(kind, value).map_err(D::Error::custom)
    }
}
