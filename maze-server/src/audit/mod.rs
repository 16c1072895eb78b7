//! Durable, timestamped audit trail of server activity.

mod event;
mod log;

#[cfg(test)]
pub use event::AuditEntry;
pub use event::EventKind;
pub use log::{AuditLog, DEFAULT_LOG_FILE};
