//! Per-connection request dispatch.
//!
//! A [`Dispatcher`] decodes each inbound message and either records a
//! telemetry event or queues a generator job on the sending [`Session`].
//! Jobs of one session start in arrival order; jobs of different sessions
//! run independently. A job's output is only ever written to the session
//! that requested it.

mod handler;
mod session;

pub use handler::Dispatcher;
