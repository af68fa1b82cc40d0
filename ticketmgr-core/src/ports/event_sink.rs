//! Event sink port - where the services report what happened

use crate::services::LogEvent;

/// Receives log events from the services
///
/// Recording must never fail the operation that reports the event, so
/// implementations swallow their own errors.
pub trait EventSink: Send + Sync {
    fn record(&self, event: LogEvent);
}
