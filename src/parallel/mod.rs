//! Thread-pool plumbing shared by the pipeline stages.
//!
//! Shards have no shared state, so counting them and re-splitting sibling
//! skewed shards run on a small pool of worker threads fed from a
//! [`task_queue::TaskQueue`].

pub mod task_queue;
pub mod worker_pool;

pub use task_queue::TaskQueue;
pub use worker_pool::{collect_results, default_worker_threads, WorkerPool};
