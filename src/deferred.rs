//! Zero-delay deferred execution for milestone handlers.
//!
//! Handlers never run inside a dispatch pass. Each matched handler becomes
//! its own [`Task`] and runs on a later turn, in the order the pass queued it.
//! Queued tasks cannot be cancelled: removing a handler only stops future
//! passes from finding it.

use log::error;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a task on a later turn.
pub trait Defer: Send + Sync {
    fn defer(&self, task: Task);
}

/// Run one task, reporting a panic instead of propagating it.
fn run_task(task: Task) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!("milestone handler panicked: {}", msg);
    }
}

/// Explicit FIFO queue drained by the embedder (or a test) between signals.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.tasks.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run queued tasks until none are left, including tasks queued by the
    /// tasks themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // The lock is released before running so tasks may queue more work.
            let next = match self.tasks.lock() {
                Ok(mut q) => q.pop_front(),
                Err(_) => None,
            };
            let Some(task) = next else { break };
            run_task(task);
            ran += 1;
        }
        ran
    }
}

impl Defer for TaskQueue {
    fn defer(&self, task: Task) {
        if let Ok(mut q) = self.tasks.lock() {
            q.push_back(task);
        }
    }
}

/// Queue drained by a single task on the current tokio runtime.
///
/// A single consumer keeps insertion order; dropping every `TokioQueue`
/// handle lets the consumer finish the backlog and exit.
#[derive(Clone)]
pub struct TokioQueue {
    tx: mpsc::UnboundedSender<Task>,
}

impl TokioQueue {
    /// Spawn the consumer. Must be called from within a tokio runtime.
    pub fn spawn() -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let handle = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                run_task(task);
            }
        });
        (Self { tx }, handle)
    }
}

impl Defer for TokioQueue {
    fn defer(&self, task: Task) {
        if self.tx.send(task).is_err() {
            error!("deferred task dropped: queue consumer has stopped");
        }
    }
}
