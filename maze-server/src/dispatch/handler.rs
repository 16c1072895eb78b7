//! Message routing and job execution.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audit::{AuditLog, EventKind};
use crate::metrics;
use crate::models::{Command, JobRequest, SessionId};
use crate::process::{invoke, GeneratorOptions, JobPermit, JobPool};

use super::session::Session;

/// Label recorded for client-side pathfinding runs.
const ALGORITHM: &str = "A*";

/// Routes decoded client messages to the generator and the audit log.
///
/// Cheap to clone; every job task carries its own copy.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    audit: Arc<AuditLog>,
    generator: Arc<GeneratorOptions>,
    pool: JobPool,
    reply_errors: bool,
}

impl Dispatcher {
    pub fn new(audit: Arc<AuditLog>, generator: GeneratorOptions, pool: JobPool) -> Self {
        Self {
            audit,
            generator: Arc::new(generator),
            pool,
            reply_errors: false,
        }
    }

    /// Also send an error document to the client when a job fails.
    pub const fn with_error_replies(mut self, enabled: bool) -> Self {
        self.reply_errors = enabled;
        self
    }

    pub(super) const fn pool(&self) -> &JobPool {
        &self.pool
    }

    /// Create the dispatcher-side state for a new connection.
    pub fn open_session(&self, id: SessionId, outbound: mpsc::Sender<Vec<u8>>) -> Session {
        Session::open(id, outbound, self.clone(), self.pool.session_slots())
    }

    /// Handle one inbound message.
    ///
    /// Telemetry is recorded immediately; `generate` is recorded and queued
    /// on the session's job worker. Undecodable messages are reported to the
    /// operational log and otherwise ignored.
    pub fn handle_message(&self, session: &Session, raw: &[u8]) {
        let command = match Command::parse(raw) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(
                    session = %session.id(),
                    error = %e,
                    message = %String::from_utf8_lossy(raw),
                    "ignoring undecodable message"
                );
                return;
            }
        };

        match command {
            Command::Generate { size } => {
                tracing::info!(session = %session.id(), size, "generating maze");
                self.audit
                    .record(EventKind::MazeGenerationRequested, format!("Size: {size}x{size}"));
                let job = JobRequest::new(size, session.id().clone(), session.outbound());
                session.enqueue(job);
            }
            Command::Visualize { maze_size } => {
                self.audit.record(
                    EventKind::PathfindingVisualizationStarted,
                    format!("Algorithm: {ALGORITHM}, Maze Size: {maze_size}"),
                );
            }
            Command::VisualizationComplete { duration } => {
                self.audit.record(
                    EventKind::PathfindingVisualizationCompleted,
                    format!("Duration: {duration}ms"),
                );
            }
        }
    }

    /// Run one job to completion and route its output to the requester.
    pub(super) async fn run_job(self, job: JobRequest, permit: JobPermit) {
        let size = job.size;

        let queued_ms = (chrono::Utc::now() - job.requested_at).num_milliseconds();
        tracing::debug!(
            queued_ms,
            global_free = ?self.pool.available_permits(),
            "starting generator"
        );

        let outcome = invoke(&self.generator, size).await;
        drop(permit);

        match outcome {
            Err(e) => {
                tracing::warn!(error = %e, "maze generation failed");
                self.audit.record(
                    EventKind::MazeGenerationFailed,
                    format!("Size: {size}, Error: {e}"),
                );
                if self.reply_errors {
                    let body = serde_json::json!({
                        "type": "error",
                        "size": size,
                        "message": e.to_string(),
                    });
                    self.reply(&job, body.to_string().into_bytes()).await;
                }
            }
            Ok(done) => {
                let millis = done.elapsed.as_millis();
                let detail = match metrics::extract(&done.stdout) {
                    Some(m) => format!(
                        "Size: {size}x{size}, Execution Time: {millis}ms, \
                         Path Length: {} cells, Explored Nodes: {}",
                        m.path_length, m.explored_nodes
                    ),
                    None => format!("Size: {size}x{size}, Execution Time: {millis}ms"),
                };
                self.audit.record(EventKind::MazeGeneratedSuccessfully, detail);
                self.reply(&job, done.stdout).await;
            }
        }
    }

    async fn reply(&self, job: &JobRequest, payload: Vec<u8>) {
        let Some(outbound) = job.reply_channel() else {
            tracing::debug!(session = %job.session_id, "session closed, discarding result");
            return;
        };
        if outbound.send(payload).await.is_err() {
            tracing::debug!(session = %job.session_id, "connection writer gone, discarding result");
        }
    }
}
