use bytes::Bytes;

use crate::counter::FrequencyCounter;
use crate::record::CountRecord;

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct Node {
    /// Outgoing edges sorted by byte.
    children: Vec<(u8, usize)>,
    /// Occurrences of the record ending at this node.
    count: u64,
}

/// Counts records in a byte trie stored in a flat arena.
///
/// Records that share a prefix share the nodes for it, which keeps memory
/// down for URL-like data. Drained records come out in byte order.
#[derive(Debug)]
pub struct PrefixTreeCounter {
    nodes: Vec<Node>,
    distinct: usize,
}

impl Default for PrefixTreeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTreeCounter {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            distinct: 0,
        }
    }

    fn find(&self, record: &[u8]) -> Option<usize> {
        let mut node = ROOT;
        for byte in record {
            let children = &self.nodes[node].children;
            let slot = children.binary_search_by_key(byte, |(b, _)| *b).ok()?;
            node = children[slot].1;
        }
        Some(node)
    }

    fn child_or_insert(&mut self, node: usize, byte: u8) -> usize {
        match self.nodes[node]
            .children
            .binary_search_by_key(&byte, |(b, _)| *b)
        {
            Ok(slot) => self.nodes[node].children[slot].1,
            Err(slot) => {
                let child = self.nodes.len();
                self.nodes.push(Node::default());
                self.nodes[node].children.insert(slot, (byte, child));
                child
            }
        }
    }
}

impl FrequencyCounter for PrefixTreeCounter {
    fn increment(&mut self, record: &[u8]) {
        let mut node = ROOT;
        for &byte in record {
            node = self.child_or_insert(node, byte);
        }
        if self.nodes[node].count == 0 {
            self.distinct += 1;
        }
        self.nodes[node].count += 1;
    }

    fn get(&self, record: &[u8]) -> u64 {
        self.find(record)
            .map(|node| self.nodes[node].count)
            .unwrap_or(0)
    }

    fn len(&self) -> usize {
        self.distinct
    }

    fn drain(self: Box<Self>) -> Vec<CountRecord> {
        let mut records = Vec::with_capacity(self.distinct);
        let mut path: Vec<u8> = Vec::new();
        // (node, depth, byte on the edge into the node)
        let mut stack = vec![(ROOT, 0usize, 0u8)];

        while let Some((node, depth, byte)) = stack.pop() {
            if depth > 0 {
                path.truncate(depth - 1);
                path.push(byte);
            }

            let Node { children, count } = &self.nodes[node];
            if *count > 0 {
                records.push(CountRecord::new(Bytes::copy_from_slice(&path), *count));
            }
            for &(child_byte, child) in children.iter().rev() {
                stack.push((child, depth + 1, child_byte));
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_byte_order() {
        let mut counter = Box::new(PrefixTreeCounter::new());
        for record in ["b.com", "a.com/x", "a.com", "a.com/x", "ab"] {
            counter.increment(record.as_bytes());
        }

        let drained: Vec<(Vec<u8>, u64)> = counter
            .drain()
            .into_iter()
            .map(|c| (c.record.to_vec(), c.count))
            .collect();
        assert_eq!(
            drained,
            vec![
                (b"a.com".to_vec(), 1),
                (b"a.com/x".to_vec(), 2),
                (b"ab".to_vec(), 1),
                (b"b.com".to_vec(), 1),
            ]
        );
    }

    #[test]
    fn test_prefix_is_not_counted_as_record() {
        let mut counter = PrefixTreeCounter::new();
        counter.increment(b"http://example.com/page");
        assert_eq!(counter.get(b"http://example.com/"), 0);
        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_empty_record() {
        let mut counter = Box::new(PrefixTreeCounter::new());
        counter.increment(b"");
        counter.increment(b"");
        assert_eq!(counter.get(b""), 2);
        assert_eq!(counter.drain(), vec![CountRecord::new(Bytes::new(), 2)]);
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        let mut counter = PrefixTreeCounter::new();
        counter.increment(b"http://example.com/a");
        let nodes_after_first = counter.nodes.len();
        counter.increment(b"http://example.com/b");
        // Only the final byte needs a new node
        assert_eq!(counter.nodes.len(), nodes_after_first + 1);
    }
}
