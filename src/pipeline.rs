//! The partition, count and reduce stages wired together.
//!
//! Each stage is also exposed on its own so a driver can restart a failed run
//! from the beginning of the stage that failed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;

use crate::counter::{CounterConfig, CounterKind, ShardCounter, SkewCountMode};
use crate::error::{Result, ShardTopError};
use crate::heap::RankedItem;
use crate::parallel::{default_worker_threads, WorkerPool};
use crate::partitioner::{Partitioner, PartitionerConfig};
use crate::reducer::{Reducer, ReducerConfig};
use crate::shard_tree::ShardTree;
use crate::sharding::MultiPathShardLocator;

/// Configuration for a full run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub partitioner: PartitionerConfig,
    pub counter: CounterConfig,
    pub reducer: ReducerConfig,

    /// Threads counting shards concurrently (default: number of CPUs)
    pub worker_threads: usize,

    /// How skew-split shards are counted (default: reassembled per top-level shard)
    pub skew_count_mode: SkewCountMode,

    /// Delete `<input>-parted` once the ranking is computed (default: false)
    pub remove_intermediate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let worker_threads = default_worker_threads();
        Self {
            partitioner: PartitionerConfig::default().with_skew_threads(worker_threads),
            counter: CounterConfig::default(),
            reducer: ReducerConfig::default(),
            worker_threads,
            skew_count_mode: SkewCountMode::default(),
            remove_intermediate: false,
        }
    }
}

impl PipelineConfig {
    pub fn new(split_size_bytes: u64, top_n: usize) -> Self {
        let defaults = Self::default();
        Self {
            partitioner: PartitionerConfig::new(split_size_bytes)
                .with_skew_threads(defaults.worker_threads),
            reducer: ReducerConfig::new(top_n),
            ..defaults
        }
    }

    pub fn with_counter_kind(mut self, kind: CounterKind) -> Self {
        self.counter = self.counter.with_kind(kind);
        self
    }

    /// Sets the threads used for counting and for re-splitting skewed shards.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self.partitioner = self.partitioner.with_skew_threads(worker_threads);
        self
    }

    pub fn with_skew_count_mode(mut self, mode: SkewCountMode) -> Self {
        self.skew_count_mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.partitioner = self.partitioner.with_seed(seed);
        self
    }

    pub fn with_remove_intermediate(mut self, remove: bool) -> Self {
        self.remove_intermediate = remove;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(ShardTopError::InvalidConfig(
                "worker threads must be greater than zero".to_string(),
            ));
        }
        self.partitioner.validate()?;
        self.counter.validate()?;
        self.reducer.validate()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    partitioner: Partitioner,
    counter: ShardCounter,
    reducer: Reducer,
    pool: WorkerPool,
}

impl Pipeline {
    /// Validates the whole configuration. Nothing touches the filesystem yet.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            partitioner: Partitioner::new(config.partitioner.clone())?,
            counter: ShardCounter::new(config.counter.clone())?,
            reducer: Reducer::new(config.reducer.clone())?,
            pool: WorkerPool::new(config.worker_threads),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs all three stages on `input` and returns the ranking, highest count first.
    ///
    /// The input file itself is never deleted.
    pub fn run(&self, input: &Path) -> Result<Vec<RankedItem>> {
        let start = Instant::now();

        let tree = self.partition(input)?;
        info!(
            "partitioned `{}` into {} leaf shards in {:?}",
            input.display(),
            tree.leaf_paths().len(),
            start.elapsed()
        );

        let mut count_files = self.count(&tree)?;
        count_files.sort();
        info!("wrote {} count files in {:?}", count_files.len(), start.elapsed());

        let ranking = self.reduce_files(count_files)?;

        if self.config.remove_intermediate {
            info!("removing `{}`", tree.path().display());
            fs::remove_dir_all(tree.path()).map_err(ShardTopError::at_path(tree.path()))?;
        }

        info!(
            "ranked {} records from `{}` in {:?}",
            ranking.len(),
            input.display(),
            start.elapsed()
        );
        Ok(ranking)
    }

    /// Partitions `input` into `<input>-parted`, replacing any previous run.
    pub fn partition(&self, input: &Path) -> Result<ShardTree> {
        self.partitioner.partition(input, true)
    }

    /// Writes the count files for a partition and returns their paths.
    pub fn count(&self, tree: &ShardTree) -> Result<Vec<PathBuf>> {
        self.counter
            .count_partition(tree, self.config.skew_count_mode, &self.pool)
    }

    /// Reduces the count files already present below a partition directory.
    pub fn reduce(&self, parted_dir: &Path) -> Result<Vec<RankedItem>> {
        let recursive = self.config.skew_count_mode == SkewCountMode::PerLeaf;
        self.reducer.reduce_dir(parted_dir, recursive)
    }

    /// Reduces an explicit list of count files, in the given order.
    pub fn reduce_files(&self, count_files: Vec<PathBuf>) -> Result<Vec<RankedItem>> {
        let locator = MultiPathShardLocator::new(count_files)?;
        self.reducer.reduce_locator(&locator)
    }
}
