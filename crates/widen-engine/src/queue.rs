//! The host's deferred task queue.
//!
//! Tasks are posted from any thread and run by whoever drains the queue,
//! normally the host's simulation thread between frames.

use crossbeam_channel::{Receiver, Sender};

/// A one-shot task.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Multi-producer queue of one-shot tasks.
///
/// Cloning shares the queue.
#[derive(Clone)]
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl TaskQueue {
    /// Create an empty, unbounded queue.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Post a task.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(Box::new(task));
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every task queued at the time of the call, in posting order.
    ///
    /// Tasks posted while draining run on the next drain. Returns the
    /// number of tasks run.
    pub fn drain(&self) -> usize {
        let queued = self.rx.len();
        let mut ran = 0;
        while ran < queued {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
