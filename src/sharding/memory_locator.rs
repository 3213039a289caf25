use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, ShardTopError};
use crate::sharding::traits::{Shard, ShardLocator};

/// A memory-based shard locator.
///
/// This locator provides in-memory Cursors as shards, which is useful for
/// tests or when count data is already in memory. The factory receives the
/// index of the shard it should produce.
pub struct MemoryShardLocator<F>
where
    F: Fn(usize) -> Result<Cursor<Vec<u8>>> + Send + Sync + 'static,
{
    /// Function that creates shard sources
    source_factory: F,

    /// Number of shards to create
    shard_count: usize,

    /// Index of the next shard to return
    next_index: AtomicUsize,
}

impl<F> MemoryShardLocator<F>
where
    F: Fn(usize) -> Result<Cursor<Vec<u8>>> + Send + Sync + 'static,
{
    /// Create a new MemoryShardLocator with the given factory function.
    pub fn new(source_factory: F, shard_count: usize) -> Self {
        Self {
            source_factory,
            shard_count,
            next_index: AtomicUsize::new(0),
        }
    }
}

impl MemoryShardLocator<Box<dyn Fn(usize) -> Result<Cursor<Vec<u8>>> + Send + Sync>> {
    /// Serve a fixed list of buffers, one shard per buffer.
    pub fn from_buffers(buffers: Vec<Vec<u8>>) -> Self {
        let shard_count = buffers.len();
        Self::new(
            Box::new(move |index| Ok(Cursor::new(buffers[index].clone()))),
            shard_count,
        )
    }
}

impl<F> ShardLocator<Cursor<Vec<u8>>> for MemoryShardLocator<F>
where
    F: Fn(usize) -> Result<Cursor<Vec<u8>>> + Send + Sync + 'static,
{
    fn next_shard(&self) -> Result<Shard<Cursor<Vec<u8>>>> {
        // Get the current index and increment it atomically
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);

        if index >= self.shard_count {
            return Err(ShardTopError::NoMoreShards);
        }

        Ok(Shard {
            id: format!("memory-{}", index),
            source: (self.source_factory)(index)?,
        })
    }

    fn estimated_shard_count(&self) -> Option<usize> {
        Some(self.shard_count)
    }
}
