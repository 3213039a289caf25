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

//! A fixed-capacity min-heap that keeps the N largest counts seen so far.

use std::borrow::Cow;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use bytes::Bytes;

use crate::error::{Result, ShardTopError};
use crate::record::CountRecord;

/// A record and its count as held in the ranking.
///
/// Items order by count. Equal counts order by record bytes, descending, so
/// a descending ranking lists tied records in ascending byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedItem {
    pub record: Bytes,
    pub count: u64,
}

impl RankedItem {
    pub fn new(record: impl Into<Bytes>, count: u64) -> Self {
        Self {
            record: record.into(),
            count,
        }
    }

    /// The record as text, with invalid UTF-8 replaced.
    pub fn record_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.record)
    }
}

impl From<CountRecord> for RankedItem {
    fn from(count_record: CountRecord) -> Self {
        Self {
            record: count_record.record,
            count: count_record.count,
        }
    }
}

impl From<RankedItem> for CountRecord {
    fn from(item: RankedItem) -> Self {
        CountRecord::new(item.record, item.count)
    }
}

impl Ord for RankedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.record.cmp(&self.record))
    }
}

impl PartialOrd for RankedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap over [`RankedItem`] that never holds more than `capacity` entries.
///
/// Once full, an incoming item replaces the minimum only if its count is
/// strictly greater. Evicted and discarded items are gone for good.
#[derive(Debug, Clone)]
pub struct BoundedMinHeap {
    capacity: usize,
    heap: BinaryHeap<Reverse<RankedItem>>,
}

impl BoundedMinHeap {
    /// Creates an empty heap. A capacity of zero is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ShardTopError::InvalidConfig(
                "top-N capacity must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// The entry that would be evicted next.
    pub fn min(&self) -> Option<&RankedItem> {
        self.heap.peek().map(|Reverse(item)| item)
    }

    /// Offers an item to the heap.
    ///
    /// Returns true if the item was inserted (possibly evicting the minimum),
    /// false if it was discarded. Equal counts never evict.
    pub fn try_insert(&mut self, item: RankedItem) -> bool {
        if !self.is_full() {
            self.heap.push(Reverse(item));
            return true;
        }

        let evicts = self
            .heap
            .peek()
            .map_or(false, |Reverse(min)| item.count > min.count);
        if !evicts {
            return false;
        }

        self.heap.pop();
        self.heap.push(Reverse(item));
        true
    }

    /// Offers every entry of `other` to this heap.
    pub fn merge(&mut self, other: BoundedMinHeap) {
        for item in other.drain_ascending() {
            self.try_insert(item);
        }
    }

    /// Empties the heap, yielding entries from the smallest count upwards.
    pub fn drain_ascending(mut self) -> Vec<RankedItem> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(Reverse(item)) = self.heap.pop() {
            items.push(item);
        }
        items
    }

    /// Empties the heap into a ranking, highest count first.
    pub fn into_ranking(self) -> Vec<RankedItem> {
        let mut items = self.drain_ascending();
        items.reverse();
        items
    }
}
