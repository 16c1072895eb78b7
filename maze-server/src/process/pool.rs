//! Concurrency limits for generator invocations.
//!
//! Two levels of limits apply to every job:
//! - a per-session limit (default 1), so one client's overlapping requests
//!   queue behind each other in arrival order
//! - an optional server-wide limit on generator processes
//!
//! Tokio semaphores are fair, so queued jobs acquire slots in FIFO order.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of in-flight jobs allowed per session.
pub const DEFAULT_JOBS_PER_SESSION: usize = 1;

/// Shared limits for generator invocations.
#[derive(Debug, Clone)]
pub struct JobPool {
    /// Server-wide limit; `None` means unbounded.
    global: Option<Arc<Semaphore>>,

    /// Permits handed to each new session.
    per_session: usize,
}

/// Per-session job slots, created by [`JobPool::session_slots`].
#[derive(Debug, Clone)]
pub struct SessionSlots(Arc<Semaphore>);

/// Held for the duration of one invocation. Dropping it frees the slots.
#[derive(Debug)]
pub struct JobPermit {
    _session: OwnedSemaphorePermit,
    _global: Option<OwnedSemaphorePermit>,
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new(None, DEFAULT_JOBS_PER_SESSION)
    }
}

impl JobPool {
    /// Create a pool. A `per_session` of zero is treated as one.
    pub fn new(max_concurrent: Option<usize>, per_session: usize) -> Self {
        Self {
            global: max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1)))),
            per_session: per_session.max(1),
        }
    }

    /// Fresh slots for a newly connected session.
    pub fn session_slots(&self) -> SessionSlots {
        SessionSlots(Arc::new(Semaphore::new(self.per_session)))
    }

    /// Wait for a session slot, then a global slot.
    ///
    /// Returns `None` only if a semaphore was closed, which this crate never
    /// does.
    pub async fn acquire(&self, session: &SessionSlots) -> Option<JobPermit> {
        let session_permit = Arc::clone(&session.0).acquire_owned().await.ok()?;
        let global_permit = match self.global {
            Some(ref global) => Some(Arc::clone(global).acquire_owned().await.ok()?),
            None => None,
        };
        Some(JobPermit {
            _session: session_permit,
            _global: global_permit,
        })
    }

    /// Free server-wide slots, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.global.as_ref().map(|s| s.available_permits())
    }
}
