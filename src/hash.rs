//! Hashing functionality for routing records to shards.

use highway::{HighwayHash, HighwayHasher, Key};

use crate::constants::HIGHWAY_HASH_KEY;

/// Calculate the HighwayHash of a record.
///
/// Routing only depends on this being deterministic and well distributed,
/// so re-running a partition on the same input reproduces the same shards.
pub fn highway_hash(data: &[u8]) -> u64 {
    let mut hasher = HighwayHasher::new(Key(HIGHWAY_HASH_KEY));
    hasher.append(data);
    hasher.finalize64()
}

/// Hash a record with a single prefix symbol prepended.
///
/// `scratch` is reused between calls to avoid an allocation per record.
pub fn prefixed_hash(prefix: u8, record: &[u8], scratch: &mut Vec<u8>) -> u64 {
    scratch.clear();
    scratch.push(prefix);
    scratch.extend_from_slice(record);
    highway_hash(scratch)
}

/// Map a hash onto one of `shard_count` shards.
pub fn shard_index(hash: u64, shard_count: u64) -> usize {
    (hash % shard_count.max(1)) as usize
}
