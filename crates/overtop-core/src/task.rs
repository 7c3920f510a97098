#![forbid(unsafe_code)]

//! Deferred work queue.
//!
//! Work pushed onto a [`TaskQueue`] runs on the owner's next call to
//! [`TaskQueue::run_pending`]. Each call is one "turn": tasks queued while a
//! turn is running wait for the following turn.

use std::collections::VecDeque;
use std::fmt;

type Task<C> = Box<dyn FnOnce(&mut C)>;

/// FIFO of closures run against a context `C`.
pub struct TaskQueue<C> {
    tasks: VecDeque<Task<C>>,
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TaskQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

impl<C> TaskQueue<C> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Queue a task for the next turn.
    pub fn push(&mut self, task: impl FnOnce(&mut C) + 'static) {
        self.tasks.push_back(Box::new(task));
    }

    /// Number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run the tasks queued before this call, in order. Returns how many ran.
    pub fn run_pending(&mut self, ctx: &mut C) -> usize {
        let turn: Vec<Task<C>> = self.tasks.drain(..).collect();
        let count = turn.len();
        for task in turn {
            task(ctx);
        }
        count
    }

    /// Drop every queued task without running it.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
