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

//! Shardtop finds the N most frequent records of a file that does not fit in memory.
//!
//! The input is hash partitioned into size-bounded shards on disk, every shard
//! is counted exactly in memory, and the per-shard counts are merged through a
//! bounded min-heap into the global ranking.

pub mod constants;
pub mod counter;
pub mod error;
pub mod hash;
pub mod heap;
pub mod parallel;
pub mod partitioner;
pub mod pipeline;
pub mod record;
pub mod reducer;
pub mod shard_tree;
pub mod sharding;

// Re-exports for a cleaner API
pub use error::{Result, ShardTopError};
pub use pipeline::{Pipeline, PipelineConfig};
