use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, ShardTopError};
use crate::sharding::traits::{Shard, ShardLocator};
use crate::sharding::utils::find_count_paths;

/// Opens the shard at `index`, or reports that the list is exhausted.
fn open_indexed(paths: &[PathBuf], index: usize) -> Result<Shard<File>> {
    let path = paths.get(index).ok_or(ShardTopError::NoMoreShards)?;
    let source = File::open(path).map_err(ShardTopError::at_path(path))?;
    Ok(Shard {
        id: path.display().to_string(),
        source,
    })
}

/// A locator for the count files written below a partition directory.
/// Count files are returned in sorted path order.
#[derive(Debug)]
pub struct CountFileLocator {
    /// List of count file paths
    count_paths: Vec<PathBuf>,

    /// Index of the next shard to return
    next_index: AtomicUsize,
}

impl CountFileLocator {
    /// Create a new CountFileLocator for the `_cnt` files in `dir`.
    ///
    /// # Arguments
    /// * `dir` - The top-level partition directory
    /// * `recursive` - Also pick up count files written inside nested skew directories
    pub fn new(dir: &Path, recursive: bool) -> Result<Self> {
        Ok(Self {
            count_paths: find_count_paths(dir, recursive)?,
            next_index: AtomicUsize::new(0),
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.count_paths
    }
}

impl ShardLocator<File> for CountFileLocator {
    fn next_shard(&self) -> Result<Shard<File>> {
        // Get the current index and increment it atomically
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        open_indexed(&self.count_paths, index)
    }

    fn estimated_shard_count(&self) -> Option<usize> {
        Some(self.count_paths.len())
    }
}

/// A shard locator that uses an explicit list of file paths.
///
/// The pipeline uses this to hand the count files it just produced
/// straight to the reducer, without searching the directory again.
#[derive(Debug)]
pub struct MultiPathShardLocator {
    /// List of shard file paths
    shard_paths: Vec<PathBuf>,

    /// Index of the next shard to return
    next_index: AtomicUsize,
}

impl MultiPathShardLocator {
    /// Create a new MultiPathShardLocator with the given file paths.
    pub fn new(file_paths: Vec<PathBuf>) -> Result<Self> {
        if file_paths.is_empty() {
            return Err(ShardTopError::Other("No shard paths provided".to_string()));
        }

        for path in &file_paths {
            if !path.exists() {
                return Err(ShardTopError::Other(format!(
                    "Shard file does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            shard_paths: file_paths,
            next_index: AtomicUsize::new(0),
        })
    }
}

impl ShardLocator<File> for MultiPathShardLocator {
    fn next_shard(&self) -> Result<Shard<File>> {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        open_indexed(&self.shard_paths, index)
    }

    fn estimated_shard_count(&self) -> Option<usize> {
        Some(self.shard_paths.len())
    }
}
