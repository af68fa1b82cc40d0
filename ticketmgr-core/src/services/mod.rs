//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod logging;
mod secrets;
mod ticket;

pub use logging::{events, EntryPoint, LogEntry, LogEvent, LoggingService};
pub use secrets::TotpSecretService;
pub use ticket::TicketService;
