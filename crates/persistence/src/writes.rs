//! Ordered background writes for one session.
//!
//! Every optimistic mutation is queued here together with the view snapshot
//! taken right after it was applied. A single task drains the queue, so a
//! backend sees writes one at a time and in apply order: an older snapshot
//! can never land after a newer one.
//!
//! Progress is published as the sequence number of the last finished write
//! over a `watch` channel; callers wait on that instead of on the writer.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::backend::ClosetBackend;
use crate::view::{ClosetView, Mutation};

struct PendingWrite {
    sequence: u64,
    mutation: Mutation,
    snapshot: ClosetView,
}

pub(crate) struct WriteQueue {
    queue: mpsc::UnboundedSender<PendingWrite>,
    completed: watch::Receiver<u64>,
    queued: u64,
    task: JoinHandle<()>,
}

impl WriteQueue {
    /// Start draining into `backend` once `previous` (the last session's
    /// writer) has finished, so sessions never write concurrently.
    pub(crate) fn spawn(
        backend: Arc<dyn ClosetBackend>,
        previous: Option<JoinHandle<()>>,
    ) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel::<PendingWrite>();
        let (done, completed) = watch::channel(0u64);

        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            while let Some(write) = pending.recv().await {
                if let Err(e) = backend.persist(&write.mutation, &write.snapshot).await {
                    error!(
                        backend = backend.name(),
                        mutation = write.mutation.kind(),
                        error = %e,
                        "Failed to persist closet change"
                    );
                }
                done.send_replace(write.sequence);
            }
            debug!(backend = backend.name(), "Write queue drained");
        });

        Self {
            queue,
            completed,
            queued: 0,
            task,
        }
    }

    /// Queue a write. The handle finishes once it has been attempted.
    pub(crate) fn push(&mut self, mutation: Mutation, snapshot: ClosetView) -> JoinHandle<()> {
        self.queued += 1;
        let sequence = self.queued;
        let write = PendingWrite {
            sequence,
            mutation,
            snapshot,
        };
        if let Err(rejected) = self.queue.send(write) {
            error!(
                mutation = rejected.0.mutation.kind(),
                "Write queue closed, change not persisted"
            );
        }
        self.wait_for(sequence)
    }

    /// A handle that finishes once everything queued so far was attempted.
    pub(crate) fn flush(&self) -> JoinHandle<()> {
        self.wait_for(self.queued)
    }

    /// Stop accepting writes. The returned task finishes the backlog.
    pub(crate) fn close(self) -> JoinHandle<()> {
        self.task
    }

    fn wait_for(&self, sequence: u64) -> JoinHandle<()> {
        let mut completed = self.completed.clone();
        tokio::spawn(async move {
            // Err means the writer is gone and nothing is left to wait for.
            let _ = completed.wait_for(|done| *done >= sequence).await;
        })
    }
}
