//! End-to-end run over a Zipf-distributed input large enough to force skew re-splits.
//!
//! The heaviest records do not fit into a single shard, so their shards are
//! re-partitioned with prefix randomisation and their copies end up in
//! several leaves. Reassembled counting must still report exact totals;
//! per-leaf counting is expected to undercount them.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::tempdir;

use shardtop::counter::SkewCountMode;
use shardtop::error::Result;
use shardtop::heap::RankedItem;
use shardtop::pipeline::{Pipeline, PipelineConfig};

const TOTAL_LINES: usize = 1_000_000;
const DISTINCT_ZIPF_RECORDS: usize = 10_000;
const HEAD_COUNT: usize = 100_000;
const SPLIT_SIZE_BYTES: u64 = 2_500_000;
const TOP_N: usize = 10;

/// Writes `http://site{i}.example.com/` `HEAD_COUNT / i` times for every `i`,
/// padded with unique records, in shuffled order.
fn write_zipf_input(path: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(TOTAL_LINES);
    for i in 1..=DISTINCT_ZIPF_RECORDS {
        let record = format!("http://site{}.example.com/", i);
        for _ in 0..HEAD_COUNT / i {
            lines.push(record.clone());
        }
    }
    let mut unique = 0;
    while lines.len() < TOTAL_LINES {
        lines.push(format!("http://unique{}.example.org/", unique));
        unique += 1;
    }
    lines.shuffle(&mut StdRng::seed_from_u64(2024));

    let mut writer = BufWriter::new(File::create(path)?);
    for line in &lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(lines)
}

/// Exact top-N by counting the whole input in memory.
fn naive_top_n(lines: &[String], n: usize) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for line in lines {
        *counts.entry(line.as_str()).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(record, count)| (record.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

fn as_pairs(ranking: &[RankedItem]) -> Vec<(String, u64)> {
    ranking
        .iter()
        .map(|item| (item.record_lossy().into_owned(), item.count))
        .collect()
}

#[test]
fn test_skewed_input_top_n() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    let lines = write_zipf_input(&input)?;
    assert_eq!(lines.len(), TOTAL_LINES);

    let expected = naive_top_n(&lines, TOP_N);
    assert_eq!(expected[0], ("http://site1.example.com/".to_string(), 100_000));

    let config = PipelineConfig::new(SPLIT_SIZE_BYTES, TOP_N)
        .with_worker_threads(4)
        .with_seed(17);

    // The partition has several shards and at least one of them was re-split
    let reassembling = Pipeline::new(config.clone())?;
    let tree = reassembling.partition(&input)?;
    assert!(tree.children().len() >= 4);
    assert!(tree.children().iter().any(|shard| shard.is_split()));

    // Reassembled counts are exact
    let ranking = reassembling.run(&input)?;
    assert_eq!(as_pairs(&ranking), expected);

    // Per-leaf counts fragment the heaviest record
    let per_leaf =
        Pipeline::new(config.with_skew_count_mode(SkewCountMode::PerLeaf))?.run(&input)?;
    assert_eq!(per_leaf.len(), TOP_N);
    assert_ne!(as_pairs(&per_leaf), expected);

    let head_partials: Vec<u64> = per_leaf
        .iter()
        .filter(|item| &item.record[..] == b"http://site1.example.com/")
        .map(|item| item.count)
        .collect();
    assert!(head_partials.iter().all(|count| *count < 100_000));
    assert!(head_partials.iter().sum::<u64>() <= 100_000);
    assert!(per_leaf[0].count < expected[0].1);

    // The input itself is never consumed
    assert!(input.exists());

    Ok(())
}
