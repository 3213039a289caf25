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

//! Constants describing the on-disk layout and the pipeline defaults.

/// Suffix appended to a file name to form the directory its shards are written to.
pub const PARTED_DIR_SUFFIX: &str = "-parted";

/// Prefix of every shard file inside a parted directory.
pub const PART_FILE_PREFIX: &str = "part-";

/// Width of the zero-padded shard index (`part-00000`).
pub const PART_INDEX_WIDTH: usize = 5;

/// Suffix appended to a shard path to form its count file.
pub const COUNT_FILE_SUFFIX: &str = "_cnt";

/// Separator between the record and its count in a count file line.
pub const COUNT_SEPARATOR: u8 = b',';

/// Default target size of a shard (512 MiB).
pub const DEFAULT_SPLIT_SIZE_BYTES: u64 = 512 * 1024 * 1024;

/// Default number of prefix symbols used when re-splitting a skewed shard.
pub const DEFAULT_SKEW_SPLIT_FACTOR: u8 = 10;

/// Prefix symbols are drawn from `a..=z`.
pub const MAX_SKEW_SPLIT_FACTOR: u8 = 26;

/// First prefix symbol.
pub const SKEW_PREFIX_BASE: u8 = b'a';

/// Default bound on nested skew re-splits.
pub const DEFAULT_MAX_SKEW_DEPTH: usize = 8;

/// Default size of the final ranking.
pub const DEFAULT_TOP_N: usize = 1000;

/// Counting logs its progress every this many lines.
pub const PROGRESS_LOG_INTERVAL: u64 = 50_000;

/// Buffer size used for shard writers.
pub const SHARD_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// The HighwayHash key used for routing records to shards.
/// This is 'shardtop', '/records', 'shardtop', '/records' in 64-bit chunks.
pub const HIGHWAY_HASH_KEY: [u64; 4] = [
    0x706f746472616873,
    0x7364726f6365722f,
    0x706f746472616873,
    0x7364726f6365722f,
];
