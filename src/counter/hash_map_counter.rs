use std::collections::HashMap;

use bytes::Bytes;

use crate::counter::FrequencyCounter;
use crate::record::CountRecord;

/// Counts records in a `HashMap` keyed by the record bytes.
#[derive(Debug, Default)]
pub struct HashMapCounter {
    counts: HashMap<Bytes, u64>,
}

impl HashMapCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrequencyCounter for HashMapCounter {
    fn increment(&mut self, record: &[u8]) {
        // Only copy the record the first time it is seen
        match self.counts.get_mut(record) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(Bytes::copy_from_slice(record), 1);
            }
        }
    }

    fn get(&self, record: &[u8]) -> u64 {
        self.counts.get(record).copied().unwrap_or(0)
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn drain(self: Box<Self>) -> Vec<CountRecord> {
        let mut records: Vec<CountRecord> = self
            .counts
            .into_iter()
            .map(|(record, count)| CountRecord::new(record, count))
            .collect();
        records.sort_unstable_by(|a, b| a.record.cmp(&b.record));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_byte_order() {
        let mut counter = Box::new(HashMapCounter::new());
        for i in (0..500).rev() {
            counter.increment(format!("cold{}", i).as_bytes());
        }
        counter.increment(b"hot");
        counter.increment(b"hot");

        let drained = counter.drain();
        assert_eq!(drained.len(), 501);
        assert!(drained.windows(2).all(|pair| pair[0].record < pair[1].record));
        assert_eq!(drained.last(), Some(&CountRecord::new(&b"hot"[..], 2)));
    }
}
