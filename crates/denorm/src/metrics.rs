//! Counters collected by the front door, logged periodically by the binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Frames received on the front door, malformed ones included.
    frames_received: AtomicU64,
    /// Replies written back to the socket.
    replies_sent: AtomicU64,
    /// Per-task request counts.
    task_counts: Mutex<HashMap<String, u64>>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_task(&self, task: &str) {
        let mut counts = self.task_counts.lock().await;
        *counts.entry(task.to_string()).or_insert(0) += 1;
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn replies_sent(&self) -> u64 {
        self.replies_sent.load(Ordering::Relaxed)
    }

    /// Snapshot of the per-task counts.
    pub async fn task_counts(&self) -> HashMap<String, u64> {
        self.task_counts.lock().await.clone()
    }
}
