//! Error types for the shardtop pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for shardtop operations.
#[derive(Debug, Error)]
pub enum ShardTopError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An I/O error tied to a specific file or directory, such as a shard
    /// that could not be created or a directory that could not be removed.
    #[error("I/O error on '{}': {source}", .path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The top-level input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// A count file contained a line that is not `<record>,<count>`.
    /// The reduction cannot be trusted once a line is skipped, so this is fatal.
    #[error("Malformed count line {line_number} in '{}': {line:?}", .path.display())]
    MalformedCountLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    /// A configuration value was rejected before any I/O happened.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates that no more shards are available from a ShardLocator.
    #[error("No more shards available")]
    NoMoreShards,

    /// Occurs when a task queue has no tasks left.
    #[error("Queue is closed: {0}")]
    QueueClosed(String),

    /// A general error occurred.
    #[error("{0}")]
    Other(String),

    /// An error occurred while processing a specific shard.
    #[error("shard '{shard_id}': {source}")]
    ShardError {
        shard_id: String,
        #[source]
        source: Box<ShardTopError>,
    },
}

impl ShardTopError {
    /// Attaches a path to an I/O error.
    pub(crate) fn at_path(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ShardTopError::PathIo { path, source }
    }

    /// Wraps an error with the identity of the shard it came from.
    pub fn in_shard(self, shard_id: impl Into<String>) -> Self {
        ShardTopError::ShardError {
            shard_id: shard_id.into(),
            source: Box::new(self),
        }
    }
}

/// A specialized Result type for shardtop operations.
pub type Result<T> = std::result::Result<T, ShardTopError>;
