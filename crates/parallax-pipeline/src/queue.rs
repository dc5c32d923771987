//! In-process task queue feeding the worker pool.
//!
//! FIFO order across submissions. The queue itself is unbounded — `submit`
//! must never fail under load — and backend pressure is bounded by the size
//! of the worker pool instead.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::types::TaskData;

/// Queue of tasks waiting for a worker.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<TaskData>>,
    in_flight: AtomicUsize,
    notify: Notify,
}

impl TaskQueue {
    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task for execution.
    pub async fn push(&self, data: TaskData) {
        {
            let mut pending = self.pending.lock().await;
            pending.push_back(data);
        }
        self.notify.notify_one();
    }

    /// Get the next task, waiting until one is available.
    ///
    /// Called by pipeline workers.
    pub async fn next(&self) -> TaskData {
        loop {
            {
                let mut pending = self.pending.lock().await;
                if let Some(data) = pending.pop_front() {
                    debug!(task_id = %data.id, "task dequeued");
                    return data;
                }
            }

            self.notify.notified().await;
        }
    }

    /// Number of tasks waiting in the queue.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Number of tasks currently executing on workers.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Record that a worker started executing a task.
    pub(crate) fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a worker finished executing a task.
    pub(crate) fn task_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
