// Worker pool for shard-level parallelism
//
// Counting one shard and re-splitting one skewed shard are independent of
// their siblings, so a fixed set of scoped worker threads pulls tasks from a
// TaskQueue and runs them to completion.

use std::sync::Mutex;
use std::thread;

use log::{debug, error, trace};

use crate::error::{Result, ShardTopError};
use crate::parallel::task_queue::TaskQueue;

/// A fixed number of worker threads that process a batch of tasks.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    worker_threads: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(default_worker_threads())
    }
}

/// Number of CPUs, or 2 if that cannot be determined.
pub fn default_worker_threads() -> usize {
    match std::thread::available_parallelism() {
        Ok(num) => num.get(),
        Err(_) => 2,
    }
}

type ResultSlots<R> = Mutex<Vec<Option<Result<R>>>>;

impl WorkerPool {
    pub fn new(worker_threads: usize) -> Self {
        Self {
            worker_threads: worker_threads.max(1), // Ensure at least one worker
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Runs `work` once for every task and returns the results in task order.
    ///
    /// A failing task does not stop its siblings; each result is reported
    /// individually.
    pub fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<Result<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Result<R> + Sync,
    {
        let task_count = tasks.len();
        if task_count == 0 {
            return Vec::new();
        }

        let queue = TaskQueue::from_tasks(tasks.into_iter().enumerate());
        let slots: ResultSlots<R> = Mutex::new((0..task_count).map(|_| None).collect());
        let threads = self.worker_threads.min(task_count);

        thread::scope(|scope| {
            for id in 0..threads {
                let queue = &queue;
                let slots = &slots;
                let work = &work;
                scope.spawn(move || Self::worker_loop(id, queue, slots, work));
            }
        });

        slots
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(ShardTopError::Other(format!("task {} was never processed", index)))
                })
            })
            .collect()
    }

    /// Worker thread main loop
    ///
    /// Takes tasks until the queue is drained and stores each result in its slot.
    fn worker_loop<T, R, F>(id: usize, queue: &TaskQueue<(usize, T)>, slots: &ResultSlots<R>, work: &F)
    where
        F: Fn(T) -> Result<R>,
    {
        debug!("Worker thread {} starting", id);

        loop {
            match queue.read_front() {
                Ok((index, task)) => {
                    trace!("Worker {} processing task {}", id, index);
                    let result = work(task);
                    if let Err(e) = &result {
                        error!("Worker {} failed task {}: {}", id, index, e);
                    }
                    match slots.lock() {
                        Ok(mut slots) => slots[index] = Some(result),
                        Err(e) => {
                            error!("Worker {} could not record result: {}", id, e);
                            break;
                        }
                    }
                }
                Err(ShardTopError::QueueClosed(_)) => {
                    trace!("Worker {} found queue drained, exiting", id);
                    break;
                }
                Err(e) => {
                    error!("Worker {} encountered error, exiting: {}", id, e);
                    break;
                }
            }
        }

        debug!("Worker thread {} exiting", id);
    }
}

/// Returns every value, or the first error after all tasks have finished.
pub fn collect_results<R>(results: Vec<Result<R>>) -> Result<Vec<R>> {
    results.into_iter().collect()
}
