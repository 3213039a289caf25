use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::constants::PROGRESS_LOG_INTERVAL;
use crate::counter::{CounterKind, FrequencyCounter};
use crate::error::{Result, ShardTopError};
use crate::heap::{BoundedMinHeap, RankedItem};
use crate::parallel::WorkerPool;
use crate::record::{CountRecord, RecordLines, RecordPiece};
use crate::shard_tree::ShardTree;
use crate::sharding::count_file_path;

/// How count files are produced for a shard that was re-split because of skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkewCountMode {
    /// Count every leaf of the split subtree into one counter and write a
    /// single `_cnt` file for the top-level shard. Counts are exact totals.
    #[default]
    Reassemble,
    /// Write one `_cnt` file per leaf. A record scattered across leaves is
    /// reported as several partial counts, which undercounts heavy hitters.
    PerLeaf,
}

/// Configuration for counting shards
#[derive(Debug, Clone, Default)]
pub struct CounterConfig {
    /// Counting structure (default: hash map)
    pub kind: CounterKind,

    /// Keep only the shard-local top N when writing a count file (default: keep all)
    pub top_n_prefilter: Option<usize>,
}

impl CounterConfig {
    pub fn with_kind(mut self, kind: CounterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_top_n_prefilter(mut self, top_n: usize) -> Self {
        self.top_n_prefilter = Some(top_n);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n_prefilter == Some(0) {
            return Err(ShardTopError::InvalidConfig(
                "top-N prefilter must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Produces the `_cnt` files for the shards of a partition run.
#[derive(Debug, Clone)]
pub struct ShardCounter {
    config: CounterConfig,
}

impl ShardCounter {
    pub fn new(config: CounterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Counts every leaf below `shard` into one counter and writes `<shard>_cnt`.
    ///
    /// Leaves of a split shard may hold the same record, so they are merged
    /// before anything is written.
    pub fn count_shard(&self, shard: &ShardTree) -> Result<PathBuf> {
        let leaves = shard.leaf_paths();
        info!(
            "counting `{}` ({} leaf files) using type: {}",
            shard.path().display(),
            leaves.len(),
            self.config.kind
        );

        let result = self.count_leaves(&leaves).and_then(|counter| {
            let out = shard.count_file_path();
            self.write_count_file(&out, counter)?;
            Ok(out)
        });
        result.map_err(|e| e.in_shard(shard.name()))
    }

    /// Writes one `<leaf>_cnt` file next to every leaf below `shard`.
    pub fn count_leaves_separately(&self, shard: &ShardTree) -> Result<Vec<PathBuf>> {
        shard
            .leaf_paths()
            .into_iter()
            .map(|leaf| {
                let counter = self.count_leaves(std::slice::from_ref(&leaf))?;
                let out = count_file_path(&leaf);
                self.write_count_file(&out, counter)?;
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.in_shard(shard.name()))
    }

    /// Counts every top-level shard of a partition on the worker pool.
    ///
    /// A failing shard does not abort its siblings; the first failure is
    /// returned once all shards have been processed.
    pub fn count_partition(
        &self,
        partition: &ShardTree,
        mode: SkewCountMode,
        pool: &WorkerPool,
    ) -> Result<Vec<PathBuf>> {
        let shards: Vec<&ShardTree> = match partition {
            ShardTree::Leaf(_) => vec![partition],
            ShardTree::Split { children, .. } => children.iter().collect(),
        };
        info!(
            "counting {} shards of `{}` on {} workers ({:?})",
            shards.len(),
            partition.path().display(),
            pool.worker_threads(),
            mode
        );

        let results = pool.run(shards, |shard| match mode {
            SkewCountMode::Reassemble => self.count_shard(shard).map(|path| vec![path]),
            SkewCountMode::PerLeaf => self.count_leaves_separately(shard),
        });

        let mut count_files = Vec::new();
        let mut first_error = None;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(paths) => count_files.extend(paths),
                Err(e) => {
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            error!("{} shards failed to count", failed);
            return Err(e);
        }
        Ok(count_files)
    }

    /// Counts every line of every file into a single counter.
    fn count_leaves(&self, leaves: &[PathBuf]) -> Result<Box<dyn FrequencyCounter>> {
        let mut counter = self.config.kind.create();

        for leaf in leaves {
            let file = File::open(leaf).map_err(ShardTopError::at_path(leaf))?;
            let mut lines = RecordLines::new(BufReader::new(file));

            loop {
                let piece = lines.next_record().map_err(|source| ShardTopError::PathIo {
                    path: leaf.clone(),
                    source,
                })?;
                match piece {
                    RecordPiece::Record(record) => counter.increment(record),
                    RecordPiece::EOF => break,
                }
                if lines.lines_read() % PROGRESS_LOG_INTERVAL == 0 {
                    debug!("processing line {} of `{}`", lines.lines_read(), leaf.display());
                }
            }
        }

        Ok(counter)
    }

    fn write_count_file(&self, path: &Path, counter: Box<dyn FrequencyCounter>) -> Result<()> {
        let distinct = counter.len();
        let records = match self.config.top_n_prefilter {
            Some(top_n) => {
                let mut heap = BoundedMinHeap::new(top_n)?;
                for record in counter.drain() {
                    heap.try_insert(RankedItem::from(record));
                }
                heap.drain_ascending()
                    .into_iter()
                    .map(CountRecord::from)
                    .collect()
            }
            None => counter.drain(),
        };

        let file = File::create(path).map_err(ShardTopError::at_path(path))?;
        let mut writer = BufWriter::new(file);
        for record in &records {
            record
                .write_line(&mut writer)
                .map_err(ShardTopError::at_path(path))?;
        }
        writer.flush().map_err(ShardTopError::at_path(path))?;

        debug!(
            "dumped {} of {} distinct records into `{}`",
            records.len(),
            distinct,
            path.display()
        );
        Ok(())
    }
}
