//! Sharding module for creating shard files and locating them again.
//!
//! A [`Sharder`] hands out sinks for new shards, a [`ShardLocator`] hands out
//! sources for existing ones. The partitioner writes through a sharder; the
//! reducer reads count files through a locator.

mod file_locator;
mod memory_locator;
mod part_sharder;
mod traits;
pub(crate) mod utils;


pub use file_locator::{CountFileLocator, MultiPathShardLocator};
pub use memory_locator::MemoryShardLocator;
pub use part_sharder::{PartFileSharder, ShardSink};
pub use traits::{Shard, ShardLocator, Sharder};
pub use utils::{count_file_path, part_file_name, parted_dir_path};
