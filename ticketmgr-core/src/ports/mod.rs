//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod event_sink;
mod secret_store;
mod transport;

pub use event_sink::EventSink;
pub use secret_store::SecretStore;
pub use transport::{RawResponse, RequestOptions, Transport};
