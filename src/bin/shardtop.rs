//! Command line driver: prints the most frequent lines of a file.
//!
//! ```text
//! shardtop urls.txt 512 100 --counter trie --workers 8
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use shardtop::counter::{CounterKind, SkewCountMode};
use shardtop::heap::RankedItem;
use shardtop::parallel::default_worker_threads;
use shardtop::pipeline::{Pipeline, PipelineConfig};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "shardtop")]
#[command(about = "Find the N most frequent lines of a file too large to count in memory")]
#[command(version)]
struct Cli {
    /// Input file, one record per line
    input: PathBuf,

    /// Target shard size in megabytes
    split_size_mb: u64,

    /// Number of records to report
    top_n: usize,

    /// Counting structure: map or trie
    #[arg(long, default_value_t = CounterKind::HashMap)]
    counter: CounterKind,

    /// Worker threads for counting and skew re-splitting (default: number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Write one count file per skew leaf instead of reassembling split shards
    #[arg(long)]
    per_leaf_counts: bool,

    /// Seed for skew prefix randomisation
    #[arg(long)]
    seed: Option<u64>,

    /// Delete the partition directory after ranking
    #[arg(long)]
    remove_intermediate: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mode = if self.per_leaf_counts {
            SkewCountMode::PerLeaf
        } else {
            SkewCountMode::Reassemble
        };

        let mut config =
            PipelineConfig::new(self.split_size_mb.saturating_mul(BYTES_PER_MB), self.top_n)
                .with_counter_kind(self.counter)
                .with_worker_threads(self.workers.unwrap_or_else(default_worker_threads))
                .with_skew_count_mode(mode)
                .with_remove_intermediate(self.remove_intermediate);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }
}

fn print_ranking(ranking: &[RankedItem]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "rank\tcount\trecord")?;
    writeln!(out, "====================")?;
    for (rank, item) in ranking.iter().enumerate() {
        writeln!(out, "{}\t{}\t{}", rank, item.count, item.record_lossy())?;
    }
    out.flush()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let ranking = match Pipeline::new(cli.pipeline_config()).and_then(|p| p.run(&cli.input)) {
        Ok(ranking) => ranking,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = print_ranking(&ranking) {
        error!("Failed to print ranking: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
