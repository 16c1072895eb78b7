//! Per-connection session state and its job worker.

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

use crate::models::{JobRequest, SessionId};
use crate::process::SessionSlots;

use super::handler::Dispatcher;

/// One open connection as seen by the dispatcher.
///
/// Owns the strong end of the connection's outbound queue; jobs only hold
/// weak handles, so closing the session is what ends delivery.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: mpsc::Sender<Vec<u8>>,
    jobs: mpsc::UnboundedSender<JobRequest>,
    worker: JoinHandle<()>,
}

impl Session {
    pub(super) fn open(
        id: SessionId,
        outbound: mpsc::Sender<Vec<u8>>,
        dispatcher: Dispatcher,
        slots: SessionSlots,
    ) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel();
        let span = tracing::debug_span!("session", session = %id);
        let worker = tokio::spawn(run_worker(dispatcher, queue, slots).instrument(span));
        Self {
            id,
            outbound,
            jobs,
            worker,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub(super) fn outbound(&self) -> &mpsc::Sender<Vec<u8>> {
        &self.outbound
    }

    /// Queue a job behind this session's earlier jobs.
    pub(super) fn enqueue(&self, job: JobRequest) {
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            tracing::error!(session = %self.id, job = %job.id, "job worker is gone, dropping job");
        }
    }

    /// Stop delivering responses and wait for every queued or running job
    /// to finish. Queued jobs still run; their output is discarded.
    pub async fn close(self) {
        let Self {
            id,
            outbound,
            jobs,
            worker,
        } = self;
        drop(jobs);
        drop(outbound);
        join_worker(&id, worker).await;
    }

    /// Accept no further jobs, but run the queued ones and deliver their
    /// replies before closing the outbound queue.
    pub async fn drain(self) {
        let Self {
            id,
            outbound,
            jobs,
            worker,
        } = self;
        drop(jobs);
        join_worker(&id, worker).await;
        drop(outbound);
    }
}

async fn join_worker(id: &SessionId, worker: JoinHandle<()>) {
    if let Err(e) = worker.await {
        tracing::error!(session = %id, error = %e, "job worker failed");
    }
}

/// Start jobs in arrival order as slots free up, then drain on close.
async fn run_worker(
    dispatcher: Dispatcher,
    mut queue: mpsc::UnboundedReceiver<JobRequest>,
    slots: SessionSlots,
) {
    let mut running = JoinSet::new();

    while let Some(job) = queue.recv().await {
        let Some(permit) = dispatcher.pool().acquire(&slots).await else {
            tracing::error!(job = %job.id, "job pool closed");
            break;
        };
        let span = tracing::info_span!("job", id = %job.id, size = job.size);
        running.spawn(dispatcher.clone().run_job(job, permit).instrument(span));

        while let Some(result) = running.try_join_next() {
            report(result);
        }
    }

    while let Some(result) = running.join_next().await {
        report(result);
    }
}

fn report(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "job task failed");
    }
}
