//! Data models for sessions, commands and jobs.

mod command;
mod job;
mod session;

pub use command::Command;
pub use job::JobRequest;
pub use session::SessionId;
