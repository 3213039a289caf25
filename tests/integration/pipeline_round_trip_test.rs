//! Integration tests running the whole pipeline on small inputs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use shardtop::counter::{CounterKind, SkewCountMode};
use shardtop::error::{Result, ShardTopError};
use shardtop::heap::RankedItem;
use shardtop::pipeline::{Pipeline, PipelineConfig};
use shardtop::sharding::parted_dir_path;

/// Helper function to write raw lines to an input file.
fn write_input(path: &Path, lines: &[Vec<u8>]) -> Result<()> {
    let mut content = Vec::new();
    for line in lines {
        content.extend_from_slice(line);
        content.push(b'\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Random records drawn from a small vocabulary so that counts repeat.
fn random_lines(seed: u64, count: usize, vocabulary: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            // Square the draw to bias towards low ids
            let draw: f64 = rng.gen();
            let id = ((draw * draw) * vocabulary as f64) as usize;
            format!("http://example.com/page/{}", id).into_bytes()
        })
        .collect()
}

fn exact_ranking(lines: &[Vec<u8>], n: usize) -> Vec<(Vec<u8>, u64)> {
    let mut counts: HashMap<&[u8], u64> = HashMap::new();
    for line in lines {
        *counts.entry(line.as_slice()).or_insert(0) += 1;
    }
    let mut sorted: Vec<(Vec<u8>, u64)> = counts
        .into_iter()
        .map(|(record, count)| (record.to_vec(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

fn as_pairs(ranking: &[RankedItem]) -> Vec<(Vec<u8>, u64)> {
    ranking
        .iter()
        .map(|item| (item.record.to_vec(), item.count))
        .collect()
}

/// Two rankings agree when their counts match and every record ranked above
/// the last count matches. Which of several records tied at the last count
/// survives depends on the order entries were visited in.
fn assert_rankings_agree(left: &[(Vec<u8>, u64)], right: &[(Vec<u8>, u64)]) {
    let counts = |pairs: &[(Vec<u8>, u64)]| pairs.iter().map(|p| p.1).collect::<Vec<_>>();
    assert_eq!(counts(left), counts(right));

    let boundary = left.last().map(|p| p.1);
    let above = |pairs: &[(Vec<u8>, u64)]| {
        pairs
            .iter()
            .filter(|p| Some(p.1) != boundary)
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(above(left), above(right));
}

#[test]
fn test_ranking_matches_exact_count() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    let lines = random_lines(1, 20_000, 500);
    write_input(&input, &lines)?;

    // Small shards so that several of them get re-split
    let config = PipelineConfig::new(20_000, 25).with_worker_threads(3).with_seed(8);
    let ranking = Pipeline::new(config)?.run(&input)?;

    assert_rankings_agree(&as_pairs(&ranking), &exact_ranking(&lines, 25));

    Ok(())
}

#[test]
fn test_counter_kinds_agree() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    let lines = random_lines(2, 5_000, 200);
    write_input(&input, &lines)?;

    let mut rankings = Vec::new();
    for kind in [CounterKind::HashMap, CounterKind::PrefixTree] {
        let config = PipelineConfig::new(8_000, 10)
            .with_counter_kind(kind)
            .with_worker_threads(2)
            .with_seed(4);
        rankings.push(as_pairs(&Pipeline::new(config)?.run(&input)?));
    }

    assert_rankings_agree(&rankings[0], &rankings[1]);

    Ok(())
}

#[test]
fn test_worker_count_does_not_change_result() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    let lines = random_lines(3, 5_000, 300);
    write_input(&input, &lines)?;

    let run = |workers: usize| -> Result<Vec<(Vec<u8>, u64)>> {
        let config = PipelineConfig::new(6_000, 15)
            .with_worker_threads(workers)
            .with_seed(6);
        Ok(as_pairs(&Pipeline::new(config)?.run(&input)?))
    };

    assert_rankings_agree(&run(1)?, &run(4)?);

    Ok(())
}

#[test]
fn test_raw_byte_records() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("raw.txt");
    let lines = vec![
        vec![0xff, 0xfe, b'x'],
        b"  padded\r".to_vec(),
        vec![0xff, 0xfe, b'x'],
        b"padded".to_vec(),
        Vec::new(),
        vec![0xff, 0xfe, b'x'],
        Vec::new(),
    ];
    write_input(&input, &lines)?;

    let ranking = Pipeline::new(PipelineConfig::new(1 << 20, 5))?.run(&input)?;

    // Surrounding whitespace is not part of a record; empty lines are records too
    assert_eq!(
        as_pairs(&ranking),
        vec![
            (vec![0xff, 0xfe, b'x'], 3),
            (Vec::new(), 2),
            (b"padded".to_vec(), 2),
        ]
    );

    Ok(())
}

#[test]
fn test_per_leaf_mode_without_skew_is_exact() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    let lines = random_lines(5, 2_000, 100);
    write_input(&input, &lines)?;

    // One shard holds everything, so there is nothing to scatter
    let config = PipelineConfig::new(1 << 20, 10).with_skew_count_mode(SkewCountMode::PerLeaf);
    let ranking = Pipeline::new(config)?.run(&input)?;

    assert_rankings_agree(&as_pairs(&ranking), &exact_ranking(&lines, 10));

    Ok(())
}

#[test]
fn test_missing_input_leaves_no_output() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("absent.txt");

    let pipeline = Pipeline::new(PipelineConfig::new(1000, 10)).unwrap();
    assert!(matches!(
        pipeline.run(&input),
        Err(ShardTopError::InputNotFound(_))
    ));
    assert!(!parted_dir_path(&input).exists());
}

#[test]
fn test_unknown_counter_kind() {
    assert!(matches!(
        "btree".parse::<CounterKind>(),
        Err(ShardTopError::InvalidConfig(_))
    ));
    assert_eq!("TRIE".parse::<CounterKind>().unwrap(), CounterKind::PrefixTree);
}
