// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hash partitioning of an input file into size-bounded shards.
//!
//! Every record is routed by its HighwayHash into one of
//! `K = ceil(size / split_size_bytes)` shard files. A shard that still ends up
//! larger than `split_size_bytes` is partitioned again into its own
//! `<shard>-parted` directory. Nested partitions prepend a random prefix
//! symbol to each record before hashing, so a single heavy record is spread
//! over several children. Identical records are then no longer confined to
//! one shard, but they never leave the subtree of the shard they started in.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{
    DEFAULT_MAX_SKEW_DEPTH, DEFAULT_SKEW_SPLIT_FACTOR, DEFAULT_SPLIT_SIZE_BYTES,
    MAX_SKEW_SPLIT_FACTOR, SKEW_PREFIX_BASE,
};
use crate::error::{Result, ShardTopError};
use crate::hash::{highway_hash, prefixed_hash, shard_index};
use crate::parallel::{collect_results, WorkerPool};
use crate::record::{RecordLines, RecordPiece};
use crate::shard_tree::ShardTree;
use crate::sharding::{parted_dir_path, PartFileSharder, ShardSink, Sharder};

/// Configuration for partitioning
#[derive(Debug, Clone)]
pub struct PartitionerConfig {
    /// Target upper bound for a shard file in bytes (default: 512 MiB)
    pub split_size_bytes: u64,

    /// Number of distinct prefix symbols used when re-splitting a skewed shard (default: 10)
    pub skew_split_factor: u8,

    /// How many nested re-splits are attempted before an oversized shard is left as is (default: 8)
    pub max_skew_depth: usize,

    /// Seed for prefix randomisation; `None` draws from entropy
    pub seed: Option<u64>,

    /// Threads used to re-split sibling skewed shards (default: 1)
    pub skew_threads: usize,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            split_size_bytes: DEFAULT_SPLIT_SIZE_BYTES,
            skew_split_factor: DEFAULT_SKEW_SPLIT_FACTOR,
            max_skew_depth: DEFAULT_MAX_SKEW_DEPTH,
            seed: None,
            skew_threads: 1,
        }
    }
}

impl PartitionerConfig {
    pub fn new(split_size_bytes: u64) -> Self {
        Self {
            split_size_bytes,
            ..Self::default()
        }
    }

    pub fn with_skew_split_factor(mut self, factor: u8) -> Self {
        self.skew_split_factor = factor;
        self
    }

    pub fn with_max_skew_depth(mut self, depth: usize) -> Self {
        self.max_skew_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_skew_threads(mut self, threads: usize) -> Self {
        self.skew_threads = threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.split_size_bytes == 0 {
            return Err(ShardTopError::InvalidConfig(
                "split size must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_SKEW_SPLIT_FACTOR).contains(&self.skew_split_factor) {
            return Err(ShardTopError::InvalidConfig(format!(
                "skew split factor must be in 1..={}, got {}",
                MAX_SKEW_SPLIT_FACTOR, self.skew_split_factor
            )));
        }
        if self.skew_threads == 0 {
            return Err(ShardTopError::InvalidConfig(
                "skew threads must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A skewed shard waiting to be partitioned again.
struct SkewedShard {
    index: usize,
    path: PathBuf,
    lineage: u64,
}

pub struct Partitioner {
    config: PartitionerConfig,
}

impl Partitioner {
    pub fn new(config: PartitionerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PartitionerConfig {
        &self.config
    }

    /// Partitions `input` into `<input>-parted/part-NNNNN` and re-splits skewed shards.
    ///
    /// The input is deleted afterwards unless `preserve_original` is set.
    /// Any existing `<input>-parted` directory is replaced.
    pub fn partition(&self, input: &Path, preserve_original: bool) -> Result<ShardTree> {
        match fs::metadata(input) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(ShardTopError::InputNotFound(input.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ShardTopError::InputNotFound(input.to_path_buf()))
            }
            Err(e) => return Err(ShardTopError::PathIo {
                path: input.to_path_buf(),
                source: e,
            }),
        }

        self.partition_at(input, preserve_original, 0, 0)
    }

    fn partition_at(
        &self,
        input: &Path,
        preserve_original: bool,
        depth: usize,
        lineage: u64,
    ) -> Result<ShardTree> {
        let input_size = fs::metadata(input)
            .map_err(ShardTopError::at_path(input))?
            .len();
        let shard_count = input_size.div_ceil(self.config.split_size_bytes).max(1);

        let output_dir = parted_dir_path(input);
        if output_dir.exists() {
            debug!("removing stale `{}`", output_dir.display());
            fs::remove_dir_all(&output_dir).map_err(ShardTopError::at_path(&output_dir))?;
        }
        fs::create_dir_all(&output_dir).map_err(ShardTopError::at_path(&output_dir))?;

        info!(
            "partitioning `{}` ({} bytes) into {} shards at depth {}",
            input.display(),
            input_size,
            shard_count,
            depth
        );

        let sharder = PartFileSharder::new(output_dir.clone());
        let mut sinks = (0..shard_count)
            .map(|_| sharder.create_sink())
            .collect::<Result<Vec<ShardSink>>>()?;

        self.route_records(input, &mut sinks, depth, lineage)?;

        let shards = sinks
            .into_iter()
            .map(ShardSink::finish)
            .collect::<Result<Vec<(PathBuf, u64)>>>()?;

        let mut skewed = Vec::new();
        for (index, (path, size)) in shards.iter().enumerate() {
            if *size <= self.config.split_size_bytes {
                continue;
            }
            if depth >= self.config.max_skew_depth {
                warn!(
                    "shard `{}` is {} bytes but the maximum skew depth {} was reached, keeping it",
                    path.display(),
                    size,
                    self.config.max_skew_depth
                );
                continue;
            }
            // Only the first level may produce a child as large as its parent:
            // plain hashing puts every copy of a record into one shard.
            if depth > 0 && *size >= input_size {
                warn!(
                    "shard `{}` did not shrink below its parent ({} bytes), keeping it",
                    path.display(),
                    size
                );
                continue;
            }
            info!(
                "shard `{}` is skewed ({} bytes > {}), re-partitioning with prefix randomization",
                path.display(),
                size,
                self.config.split_size_bytes
            );
            skewed.push(SkewedShard {
                index,
                path: path.clone(),
                lineage: child_lineage(lineage, index),
            });
        }

        let mut children: Vec<ShardTree> = shards
            .into_iter()
            .map(|(path, _)| ShardTree::Leaf(path))
            .collect();

        if !skewed.is_empty() {
            let indices: Vec<usize> = skewed.iter().map(|shard| shard.index).collect();
            let pool = WorkerPool::new(self.config.skew_threads);
            let subtrees = collect_results(pool.run(skewed, |shard| {
                self.partition_at(&shard.path, false, depth + 1, shard.lineage)
                    .map_err(|e| e.in_shard(shard.path.display().to_string()))
            }))?;
            for (index, subtree) in indices.into_iter().zip(subtrees) {
                children[index] = subtree;
            }
        }

        if !preserve_original {
            debug!("removing `{}`", input.display());
            fs::remove_file(input).map_err(ShardTopError::at_path(input))?;
        }

        Ok(ShardTree::Split {
            dir: output_dir,
            children,
        })
    }

    /// Reads every record of `input` and appends it to the shard its hash selects.
    fn route_records(
        &self,
        input: &Path,
        sinks: &mut [ShardSink],
        depth: usize,
        lineage: u64,
    ) -> Result<()> {
        let file = File::open(input).map_err(ShardTopError::at_path(input))?;
        let mut lines = RecordLines::new(BufReader::new(file));
        let shard_count = sinks.len() as u64;

        let mut prefixes = (depth > 0).then(|| self.prefix_rng(lineage));
        let mut scratch = Vec::new();

        loop {
            let piece = lines.next_record().map_err(|source| ShardTopError::PathIo {
                path: input.to_path_buf(),
                source,
            })?;
            let record = match piece {
                RecordPiece::Record(record) => record,
                RecordPiece::EOF => break,
            };

            let hash = match prefixes.as_mut() {
                Some(rng) => {
                    let prefix =
                        SKEW_PREFIX_BASE + rng.gen_range(0..self.config.skew_split_factor);
                    prefixed_hash(prefix, record, &mut scratch)
                }
                None => highway_hash(record),
            };
            sinks[shard_index(hash, shard_count)].write_record(record)?;
        }

        debug!(
            "routed {} records from `{}`",
            lines.lines_read(),
            input.display()
        );
        Ok(())
    }

    fn prefix_rng(&self, lineage: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ lineage),
            None => StdRng::from_entropy(),
        }
    }
}

/// Identifies a nested partition by the chain of shard indices leading to it.
fn child_lineage(parent: u64, index: usize) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&parent.to_le_bytes());
    bytes[8..].copy_from_slice(&(index as u64).to_le_bytes());
    highway_hash(&bytes)
}
