//! In-flight processing state shared by the watcher and every pipeline task.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Buffered log lines per subscriber before the oldest are dropped.
const LOG_CAPACITY: usize = 256;

/// Point-in-time copy of the processing state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    /// Files currently inside `process_file`.
    pub active_tasks: usize,
    /// Files scheduled but still waiting out their delay.
    pub queue_depth: usize,
    /// Most recently started file.
    pub current_file: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl StatusSnapshot {
    pub fn is_idle(&self) -> bool {
        self.active_tasks == 0 && self.queue_depth == 0
    }
}

/// How a finished task ended, for the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Processed,
    Skipped,
    Failed,
}

/// Status block and log broadcast owned by one pipeline.
///
/// The lock is only held for field updates, never across I/O.
#[derive(Debug)]
pub struct ProcessingStatus {
    state: Mutex<StatusSnapshot>,
    log_tx: broadcast::Sender<String>,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStatus {
    pub fn new() -> Self {
        let (log_tx, _) = broadcast::channel(LOG_CAPACITY);
        Self {
            state: Mutex::new(StatusSnapshot::default()),
            log_tx,
        }
    }

    fn state(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.state().clone()
    }

    /// Receive every log line emitted after this call.
    ///
    /// A slow receiver loses the oldest lines instead of blocking the pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }

    /// Mark a file as started. The returned guard ends the task when dropped.
    pub fn begin(&self, filename: &str) -> TaskGuard<'_> {
        {
            let mut state = self.state();
            state.active_tasks += 1;
            state.current_file = Some(filename.to_string());
            state.started_at = Some(Utc::now());
        }
        TaskGuard {
            status: self,
            outcome: TaskOutcome::Failed,
        }
    }

    pub fn enqueue(&self, count: usize) {
        self.state().queue_depth += count;
    }

    pub fn dequeue(&self) {
        let mut state = self.state();
        state.queue_depth = state.queue_depth.saturating_sub(1);
    }

    fn finish(&self, outcome: TaskOutcome) {
        let mut state = self.state();
        state.active_tasks = state.active_tasks.saturating_sub(1);
        if state.active_tasks == 0 {
            state.current_file = None;
            state.started_at = None;
        }
        match outcome {
            TaskOutcome::Processed => state.processed += 1,
            TaskOutcome::Skipped => state.skipped += 1,
            TaskOutcome::Failed => state.failed += 1,
        }
    }

    /// Log at info level and broadcast.
    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        let _ = self.log_tx.send(message);
    }

    /// Log at warn level and broadcast.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        let _ = self.log_tx.send(message);
    }
}

/// Keeps a task counted as active until dropped.
///
/// Counts as failed unless [`TaskGuard::complete`] is called first, so early
/// returns through `?` are accounted for.
#[derive(Debug)]
pub struct TaskGuard<'a> {
    status: &'a ProcessingStatus,
    outcome: TaskOutcome,
}

impl TaskGuard<'_> {
    pub fn complete(&mut self, outcome: TaskOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.status.finish(self.outcome);
    }
}
