//! Least-loaded assignment of work items onto per-worker queues.
//!
//! Each worker owns one bounded queue; the dispatcher holds the sender side
//! and picks the queue with the fewest pending items (ties go to the lowest
//! worker id, so assignment is reproducible under test). The depth read is
//! a snapshot that races benignly with the worker draining its queue —
//! balance is a heuristic here, correctness only needs delivery.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::DenormError;
use crate::frame::Work;

/// The dispatcher's handle to one worker's inbound queue.
pub struct WorkerQueue {
    id: usize,
    tx: mpsc::Sender<Work>,
}

impl WorkerQueue {
    pub fn new(id: usize, tx: mpsc::Sender<Work>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of items currently queued.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

pub struct Dispatcher {
    queues: Vec<WorkerQueue>,
}

impl Dispatcher {
    pub fn new(queues: Vec<WorkerQueue>) -> Self {
        Self { queues }
    }

    /// Index of the least-loaded queue. Linear scan — worker counts are
    /// small.
    fn pick(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (index, queue) in self.queues.iter().enumerate() {
            let depth = queue.depth();
            match best {
                Some((_, least)) if least <= depth => {}
                _ => best = Some((index, depth)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Assign one work item to the least-loaded worker.
    ///
    /// Awaits when the chosen queue is full: a saturated pool slows frame
    /// ingestion instead of buffering without bound. This is the system's
    /// only backpressure mechanism.
    pub async fn assign(&self, work: Work) -> Result<(), DenormError> {
        let Some(index) = self.pick() else {
            return Err(DenormError::Transport("no worker queues".into()));
        };
        let queue = &self.queues[index];
        debug!(worker = queue.id(), depth = queue.depth(), task = %work.task, "assigning work");
        queue
            .tx
            .send(work)
            .await
            .map_err(|_| DenormError::Transport("worker queue closed".into()))
    }

    /// Pump work items from the listener's channel until it closes.
    pub async fn run(self, mut incoming: mpsc::Receiver<Work>) {
        while let Some(work) = incoming.recv().await {
            if let Err(e) = self.assign(work).await {
                warn!(error = %e, "dispatch failed, stopping");
                break;
            }
        }
        debug!("dispatcher finished");
        // Dropping the queues closes every worker's sender; workers drain
        // what is left and exit.
    }
}
