//! Uniform two-slot results returned by every service operation
//!
//! Callers never see a transport or decoding error. Every backend call
//! resolves to a status slot and a payload slot, serialized as the JSON
//! pair `[status, payload]` for foreign callers:
//!
//! | value | pair |
//! |---|---|
//! | `Outcome::Ok(body)` | `[true, body]` |
//! | `Outcome::Failed(Some(failure))` | `[false, failure]` |
//! | `Outcome::Failed(None)` | `[false, null]` |
//! | `LoginOutcome::Entity(detail)` | `["user" \| "agent" \| "admin", detail]` |
//! | `LoginOutcome::Rejected(p)` | `[null, p]` |
//! | `LoginOutcome::Ambiguous(body)` | `[null, body]` |

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::entity::{EntityDetail, EntityKind};

/// Payload of a failed call that reached the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Failure {
    /// Error status with the backend's message
    Api { status_code: u16, message: String },
    /// Error body passed through untouched (sign-up validation errors)
    Body(JsonValue),
}

impl Failure {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Failure::Api { status_code, .. } => Some(*status_code),
            Failure::Body(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Failure::Api { message, .. } => Some(message),
            Failure::Body(body) => body.get("message").and_then(JsonValue::as_str),
        }
    }
}

/// Result of a facade operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// `None` when nothing usable came back (no response, unparseable body)
    Failed(Option<Failure>),
}

impl<T> Outcome<T> {
    /// Failure with no payload
    pub fn unclassified() -> Self {
        Outcome::Failed(None)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn as_ok(&self) -> Option<&T> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Failed(failure) => failure.as_ref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(value) => Outcome::Ok(f(value)),
            Outcome::Failed(failure) => Outcome::Failed(failure),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        match self {
            Outcome::Ok(value) => {
                pair.serialize_element(&true)?;
                pair.serialize_element(value)?;
            }
            Outcome::Failed(failure) => {
                pair.serialize_element(&false)?;
                pair.serialize_element(failure)?;
            }
        }
        pair.end()
    }
}

/// Result of a login attempt
///
/// The status slot is the entity kind, or empty when no kind could be
/// determined. It is never a plain boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Authenticated; the kind is carried by the detail
    Entity(EntityDetail),
    /// The backend refused or could not be reached
    Rejected(Option<Failure>),
    /// Success status but the body names no known entity kind
    Ambiguous(JsonValue),
}

impl LoginOutcome {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            LoginOutcome::Entity(detail) => Some(detail.kind()),
            LoginOutcome::Rejected(_) | LoginOutcome::Ambiguous(_) => None,
        }
    }

    pub fn detail(&self) -> Option<&EntityDetail> {
        match self {
            LoginOutcome::Entity(detail) => Some(detail),
            LoginOutcome::Rejected(_) | LoginOutcome::Ambiguous(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            LoginOutcome::Rejected(failure) => failure.as_ref(),
            LoginOutcome::Entity(_) | LoginOutcome::Ambiguous(_) => None,
        }
    }
}

impl Serialize for LoginOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        match self {
            LoginOutcome::Entity(detail) => {
                pair.serialize_element(&detail.kind())?;
                pair.serialize_element(detail)?;
            }
            LoginOutcome::Rejected(failure) => {
                pair.serialize_element(&None::<EntityKind>)?;
                pair.serialize_element(failure)?;
            }
            LoginOutcome::Ambiguous(body) => {
                pair.serialize_element(&None::<EntityKind>)?;
                pair.serialize_element(body)?;
            }
        }
        pair.end()
    }
}
