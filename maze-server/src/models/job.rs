//! Job model for one `generate` request.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{Sender, WeakSender};
use uuid::Uuid;

use super::session::SessionId;

/// A decoded `generate` request bound to the session that sent it.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Identifier for tracing; never sent to clients.
    pub id: Uuid,
    /// Effective maze size.
    pub size: u32,
    /// Session that asked for the maze.
    pub session_id: SessionId,
    /// When the request was decoded.
    pub requested_at: DateTime<Utc>,
    /// Weak handle to the session's outbound queue. Holding it does not keep
    /// the connection alive.
    reply_to: WeakSender<Vec<u8>>,
}

impl JobRequest {
    /// Create a new request replying through `outbound`.
    pub fn new(size: u32, session_id: SessionId, outbound: &Sender<Vec<u8>>) -> Self {
        Self {
            id: Uuid::now_v7(),
            size,
            session_id,
            requested_at: Utc::now(),
            reply_to: outbound.downgrade(),
        }
    }

    /// The session's outbound queue, if the session is still open.
    pub fn reply_channel(&self) -> Option<Sender<Vec<u8>>> {
        self.reply_to.upgrade()
    }
}
