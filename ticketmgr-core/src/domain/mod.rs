//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with decoding logic - no I/O or external dependencies.

mod encryption;
mod entity;
mod event;
pub mod outcome;
pub mod result;
pub mod totp;

pub use encryption::{Argon2Params, EncryptionMetadata, EncryptionStatus};
pub use entity::{
    AdminDetail, AgentDetail, Credential, EntityDetail, EntityKind, Profile, Registration,
    UserDetail,
};
pub use event::{Event, NewEvent, TicketCheck};
pub use outcome::{Failure, LoginOutcome, Outcome};
pub use totp::TicketCode;
