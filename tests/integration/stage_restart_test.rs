//! Integration tests for running the stages separately, as a driver does
//! when it restarts a failed run from the stage that failed.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use shardtop::counter::{CounterConfig, ShardCounter, SkewCountMode};
use shardtop::error::{Result, ShardTopError};
use shardtop::parallel::WorkerPool;
use shardtop::partitioner::{Partitioner, PartitionerConfig};
use shardtop::pipeline::{Pipeline, PipelineConfig};
use shardtop::reducer::{Reducer, ReducerConfig};
use shardtop::shard_tree::ShardTree;
use shardtop::sharding::{count_file_path, parted_dir_path};

fn write_skewed_input(path: &Path) -> Result<()> {
    let mut content = String::new();
    for i in 0..3000 {
        content.push_str("http://hot.example.com/\n");
        if i % 3 == 0 {
            content.push_str(&format!("http://cold{}.example.com/\n", i));
        }
    }
    fs::write(path, content)?;
    Ok(())
}

fn ranking_pairs(pipeline: &Pipeline, dir: &Path) -> Result<Vec<(String, u64)>> {
    Ok(pipeline
        .reduce(dir)?
        .iter()
        .map(|item| (item.record_lossy().into_owned(), item.count))
        .collect())
}

#[test]
fn test_count_and_reduce_in_a_new_process() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    write_skewed_input(&input)?;

    let config = PipelineConfig::new(10_000, 3).with_worker_threads(2).with_seed(9);

    // First process: partition only
    let parted_dir = {
        let pipeline = Pipeline::new(config.clone())?;
        let tree = pipeline.partition(&input)?;
        assert!(tree.children().iter().any(ShardTree::is_split));
        tree.path().to_path_buf()
    };
    assert_eq!(parted_dir, parted_dir_path(&input));

    // Second process: rediscover, count and reduce
    let pipeline = Pipeline::new(config)?;
    let tree = ShardTree::discover(&parted_dir)?;
    let count_files = pipeline.count(&tree)?;
    assert_eq!(count_files.len(), tree.children().len());

    let ranking = ranking_pairs(&pipeline, &parted_dir)?;
    assert_eq!(ranking[0], ("http://hot.example.com/".to_string(), 3000));

    // Counting again overwrites the count files instead of appending
    pipeline.count(&tree)?;
    assert_eq!(ranking_pairs(&pipeline, &parted_dir)?, ranking);

    Ok(())
}

#[test]
fn test_per_leaf_stage_reduce_finds_nested_counts() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    write_skewed_input(&input)?;

    let partitioner = Partitioner::new(PartitionerConfig::new(10_000).with_seed(9))?;
    let tree = partitioner.partition(&input, true)?;

    let counter = ShardCounter::new(CounterConfig::default())?;
    let count_files = counter.count_partition(&tree, SkewCountMode::PerLeaf, &WorkerPool::new(3))?;
    assert_eq!(count_files.len(), tree.leaf_paths().len());
    for leaf in tree.leaf_paths() {
        assert!(count_file_path(&leaf).exists());
    }

    // Per-leaf count files live inside the nested directories
    let reducer = Reducer::new(ReducerConfig::new(5))?;
    let recursive = reducer.reduce_dir(tree.path(), true)?;
    let hot_total: u64 = recursive
        .iter()
        .filter(|item| item.record_lossy() == "http://hot.example.com/")
        .map(|item| item.count)
        .sum();
    assert!(hot_total <= 3000);
    assert!(recursive[0].count < 3000);

    Ok(())
}

#[test]
fn test_repartition_discards_previous_counts() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    write_skewed_input(&input)?;

    let pipeline = Pipeline::new(PipelineConfig::new(10_000, 3).with_seed(2))?;
    let tree = pipeline.partition(&input)?;
    pipeline.count(&tree)?;

    // A new partition run starts from a clean directory
    let tree = pipeline.partition(&input)?;
    let stale: Vec<PathBuf> = tree
        .children()
        .iter()
        .map(ShardTree::count_file_path)
        .filter(|path| path.exists())
        .collect();
    assert!(stale.is_empty());

    // Reducing before counting fails instead of reporting an empty ranking
    assert!(pipeline.reduce(tree.path()).is_err());

    Ok(())
}

#[test]
fn test_corrupt_count_file_aborts_reduce() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("urls.txt");
    write_skewed_input(&input)?;

    let pipeline = Pipeline::new(PipelineConfig::new(10_000, 3).with_seed(4))?;
    let tree = pipeline.partition(&input)?;
    let count_files = pipeline.count(&tree)?;

    fs::write(&count_files[0], "http://hot.example.com/,12\ntruncated-line\n")?;

    match pipeline.reduce(tree.path()) {
        Err(ShardTopError::MalformedCountLine {
            path,
            line_number,
            line,
        }) => {
            assert_eq!(path, count_files[0]);
            assert_eq!(line_number, 2);
            assert_eq!(line, "truncated-line");
        }
        other => panic!("Expected MalformedCountLine, got {:?}", other),
    }

    Ok(())
}
