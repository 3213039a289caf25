use std::io::{Read, Write};

use crate::error::Result;

/// A trait defining the common interface for shard creation strategies.
///
/// A Sharder is responsible for providing new sinks when requested.
pub trait Sharder<Sink: Write + Send + 'static> {
    /// Create a new sink.
    /// This is called once for every shard that is needed.
    fn create_sink(&self) -> Result<Sink>;
}

/// An opened shard together with a name identifying it in logs and errors.
#[derive(Debug)]
pub struct Shard<Source> {
    pub id: String,
    pub source: Source,
}

/// A trait for locating and opening existing shards for reading.
///
/// Implementations are shared between worker threads, so `next_shard`
/// only takes `&self`.
pub trait ShardLocator<Source: Read + Send + 'static> {
    /// Returns the next available shard source.
    ///
    /// # Returns
    /// - Ok(shard) if a shard was successfully located and opened
    /// - Err(ShardTopError::NoMoreShards) if no more shards are available
    /// - Err(...) if some other error occurred while trying to open a shard
    fn next_shard(&self) -> Result<Shard<Source>>;

    /// Returns the estimated total number of shards, if known.
    fn estimated_shard_count(&self) -> Option<usize> {
        None
    }
}
