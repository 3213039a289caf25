use crate::error::{Result, ShardTopError};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A fixed batch of tasks shared by the workers of a [`super::WorkerPool`].
///
/// The batch is complete when the queue is built, so workers call
/// [`TaskQueue::read_front`] until it reports [`ShardTopError::QueueClosed`].
#[derive(Debug)]
pub struct TaskQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> TaskQueue<T> {
    pub fn from_tasks(tasks: impl IntoIterator<Item = T>) -> Self {
        Self {
            inner: Mutex::new(tasks.into_iter().collect()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<T>>> {
        self.inner
            .lock()
            .map_err(|e| ShardTopError::Other(e.to_string()))
    }

    /// Take a task from the front of the queue
    pub fn read_front(&self) -> Result<T> {
        self.lock()?
            .pop_front()
            .ok_or_else(|| ShardTopError::QueueClosed("Queue is drained".to_string()))
    }
}
