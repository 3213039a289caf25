//! Merges count files into the global top-N ranking.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

use log::{debug, error, info};

use crate::constants::DEFAULT_TOP_N;
use crate::error::{Result, ShardTopError};
use crate::heap::{BoundedMinHeap, RankedItem};
use crate::record::{trim_record, CountRecord};
use crate::sharding::{CountFileLocator, Shard, ShardLocator};

type PartialHeaps = Mutex<BTreeMap<usize, BoundedMinHeap>>;

/// Configuration for the reduction
#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// Size of the ranking (default: 1000)
    pub top_n: usize,

    /// Threads reading count files concurrently (default: 1)
    ///
    /// With more than one thread every count file is reduced into its own
    /// heap and the heaps are merged in file order. Rankings are then the
    /// same on every run, but records tied at the N boundary may differ from
    /// the single-threaded result, and up to `top_n` entries per file are
    /// held until the merge.
    pub worker_threads: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            worker_threads: 1,
        }
    }
}

impl ReducerConfig {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            ..Self::default()
        }
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(ShardTopError::InvalidConfig(
                "top-N must be greater than zero".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ShardTopError::InvalidConfig(
                "reducer worker threads must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Feeds every `(record, count)` entry of a set of count files through a
/// [`BoundedMinHeap`], so memory stays proportional to `top_n`.
///
/// Entries are not summed: two count files holding the same record are two
/// independent candidates.
#[derive(Debug, Clone)]
pub struct Reducer {
    config: ReducerConfig,
}

impl Reducer {
    pub fn new(config: ReducerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Reduces the `_cnt` files in `dir` (and below it when `recursive`),
    /// visited in sorted path order. Returns the ranking, highest count first.
    pub fn reduce_dir(&self, dir: &Path, recursive: bool) -> Result<Vec<RankedItem>> {
        let locator = CountFileLocator::new(dir, recursive)?;
        info!(
            "reducing {} count files below `{}` to the top {}",
            locator.paths().len(),
            dir.display(),
            self.config.top_n
        );
        self.reduce_locator(&locator)
    }

    /// Reduces every shard handed out by `locator`. Returns the ranking, highest count first.
    pub fn reduce_locator<S, L>(&self, locator: &L) -> Result<Vec<RankedItem>>
    where
        S: Read + Send + 'static,
        L: ShardLocator<S> + Sync,
    {
        let heap = if self.config.worker_threads == 1 {
            let mut heap = BoundedMinHeap::new(self.config.top_n)?;
            loop {
                match locator.next_shard() {
                    Ok(shard) => {
                        self.merge_shard(shard, &mut heap)?;
                    }
                    Err(ShardTopError::NoMoreShards) => break,
                    Err(e) => return Err(e),
                }
            }
            heap
        } else {
            self.reduce_parallel(locator)?
        };

        Ok(heap.into_ranking())
    }

    fn reduce_parallel<S, L>(&self, locator: &L) -> Result<BoundedMinHeap>
    where
        S: Read + Send + 'static,
        L: ShardLocator<S> + Sync,
    {
        let next_index = Mutex::new(0usize);
        let partials: PartialHeaps = Mutex::new(BTreeMap::new());
        let failed = AtomicBool::new(false);

        let outcomes: Vec<Result<()>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.worker_threads)
                .map(|id| {
                    let next_index = &next_index;
                    let partials = &partials;
                    let failed = &failed;
                    scope.spawn(move || {
                        let result = self.reduce_worker(id, locator, next_index, partials, failed);
                        if result.is_err() {
                            failed.store(true, Ordering::SeqCst);
                        }
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(ShardTopError::Other("reducer worker panicked".to_string()))
                    })
                })
                .collect()
        });

        for outcome in outcomes {
            outcome?;
        }

        // Merge in the order the locator handed the shards out
        let partials = partials
            .into_inner()
            .map_err(|e| ShardTopError::Other(e.to_string()))?;
        let mut heap = BoundedMinHeap::new(self.config.top_n)?;
        for partial in partials.into_values() {
            heap.merge(partial);
        }
        Ok(heap)
    }

    /// Worker thread main loop: reduces one shard at a time into its own heap
    /// and files it under the shard's position in the locator order.
    fn reduce_worker<S, L>(
        &self,
        id: usize,
        locator: &L,
        next_index: &Mutex<usize>,
        partials: &PartialHeaps,
        failed: &AtomicBool,
    ) -> Result<()>
    where
        S: Read + Send + 'static,
        L: ShardLocator<S> + Sync,
    {
        debug!("Reducer worker {} starting", id);

        while !failed.load(Ordering::SeqCst) {
            let (index, shard) = {
                let mut next = next_index
                    .lock()
                    .map_err(|e| ShardTopError::Other(e.to_string()))?;
                match locator.next_shard() {
                    Ok(shard) => {
                        let index = *next;
                        *next += 1;
                        (index, shard)
                    }
                    Err(ShardTopError::NoMoreShards) => break,
                    Err(e) => {
                        error!("Reducer worker {} could not open shard: {}", id, e);
                        return Err(e);
                    }
                }
            };

            let mut partial = BoundedMinHeap::new(self.config.top_n)?;
            if let Err(e) = self.merge_shard(shard, &mut partial) {
                error!("Reducer worker {} failed: {}", id, e);
                return Err(e);
            }
            partials
                .lock()
                .map_err(|e| ShardTopError::Other(e.to_string()))?
                .insert(index, partial);
        }

        debug!("Reducer worker {} exiting", id);
        Ok(())
    }

    /// Offers every line of one count file to `heap`. Returns the number of entries read.
    fn merge_shard<S: Read>(&self, shard: Shard<S>, heap: &mut BoundedMinHeap) -> Result<usize> {
        let Shard { id, source } = shard;
        let mut reader = BufReader::new(source);
        let mut line = Vec::new();
        let mut line_number = 0;

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|source| ShardTopError::PathIo {
                    path: PathBuf::from(&id),
                    source,
                })?;
            if read == 0 {
                break;
            }
            line_number += 1;

            let entry = CountRecord::parse_line(&line).ok_or_else(|| {
                ShardTopError::MalformedCountLine {
                    path: PathBuf::from(&id),
                    line_number,
                    line: String::from_utf8_lossy(trim_record(&line)).into_owned(),
                }
            })?;
            heap.try_insert(RankedItem::from(entry));
        }

        debug!("merged {} entries from `{}`", line_number, id);
        Ok(line_number)
    }
}
