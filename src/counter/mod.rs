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

//! Exact per-shard frequency counting.
//!
//! Every shard is counted in isolation with a [`FrequencyCounter`] and the
//! result is written to the shard's `_cnt` file. Two interchangeable counter
//! structures are available; the choice is invisible to the reducer.

mod hash_map_counter;
mod prefix_tree;
mod shard_counter;

use std::fmt;
use std::str::FromStr;

use crate::error::ShardTopError;
use crate::record::CountRecord;

pub use hash_map_counter::HashMapCounter;
pub use prefix_tree::PrefixTreeCounter;
pub use shard_counter::{CounterConfig, ShardCounter, SkewCountMode};

/// An exact mapping from record to the number of times it was seen.
pub trait FrequencyCounter: Send {
    /// Count one more occurrence of `record`.
    fn increment(&mut self, record: &[u8]);

    /// Current count of `record`, zero if it was never seen.
    fn get(&self, record: &[u8]) -> u64;

    /// Number of distinct records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the counter, yielding every distinct record once in
    /// ascending byte order.
    fn drain(self: Box<Self>) -> Vec<CountRecord>;
}

/// Which counting structure to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterKind {
    /// General purpose hash map.
    #[default]
    HashMap,
    /// Byte trie, compact when records share long prefixes (URLs on the same host).
    PrefixTree,
}

impl CounterKind {
    /// Creates an empty counter of this kind.
    pub fn create(self) -> Box<dyn FrequencyCounter> {
        match self {
            CounterKind::HashMap => Box::new(HashMapCounter::new()),
            CounterKind::PrefixTree => Box::new(PrefixTreeCounter::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CounterKind::HashMap => "map",
            CounterKind::PrefixTree => "trie",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterKind {
    type Err = ShardTopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "map" | "hashmap" | "dict" => Ok(CounterKind::HashMap),
            "trie" | "prefix-tree" | "prefixtree" => Ok(CounterKind::PrefixTree),
            other => Err(ShardTopError::InvalidConfig(format!(
                "unknown counter type '{}', expected 'map' or 'trie'",
                other
            ))),
        }
    }
}
