use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::SplitConfig;
use crate::error::ScrapeError;

pub const SPLIT_FILES: [&str; 3] = ["train.jsonl", "dev.jsonl", "test.jsonl"];
const SUMMARY_FILE: &str = "split_summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub dev: usize,
    pub test: usize,
}

impl SplitCounts {
    pub fn for_total(total: usize, ratio_dev: f64, ratio_test: f64) -> Self {
        let dev = (total as f64 * ratio_dev).floor() as usize;
        let test = (total as f64 * ratio_test).floor() as usize;
        Self {
            train: total - dev - test,
            dev,
            test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Split {
    Train,
    Dev,
    Test,
}

/// Split assignment for each line index. Positions `0..train` of the (optionally
/// shuffled) index order go to train, the next `dev` to dev, the rest to test.
fn assign(counts: SplitCounts, random: bool, seed: u64) -> Vec<Split> {
    let total = counts.train + counts.dev + counts.test;
    let mut order: Vec<usize> = (0..total).collect();
    if random {
        fastrand::Rng::with_seed(seed).shuffle(&mut order);
    }

    let mut assignment = vec![Split::Test; total];
    for (pos, &line) in order.iter().enumerate() {
        assignment[line] = if pos < counts.train {
            Split::Train
        } else if pos < counts.train + counts.dev {
            Split::Dev
        } else {
            Split::Test
        };
    }
    assignment
}

/// Partition a JSONL file into train/dev/test files under `save_dir`,
/// preserving each record's bytes and the input order within a split.
pub fn split_dataset(config: &SplitConfig) -> Result<SplitCounts> {
    let lines = read_records(config)?;
    let counts = SplitCounts::for_total(lines.len(), config.ratio_dev, config.ratio_test);
    info!("# training samples: {}", counts.train);
    info!("# development samples: {}", counts.dev);
    info!("# test samples: {}", counts.test);

    std::fs::create_dir_all(&config.save_dir)
        .with_context(|| format!("Failed to create {}", config.save_dir.display()))?;

    let mut writers = Vec::with_capacity(SPLIT_FILES.len());
    for name in SPLIT_FILES {
        let path = config.save_dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writers.push(BufWriter::new(file));
    }

    for (line, split) in lines.iter().zip(assign(counts, config.random, config.seed)) {
        let writer = &mut writers[split as usize];
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    for mut writer in writers {
        writer.flush()?;
    }

    let summary = config.save_dir.join(SUMMARY_FILE);
    std::fs::write(&summary, serde_json::to_vec_pretty(&counts)?)
        .with_context(|| format!("Failed to write {}", summary.display()))?;

    Ok(counts)
}

/// Non-blank lines of the input, each checked to be a JSON record.
fn read_records(config: &SplitConfig) -> Result<Vec<String>> {
    let file = File::open(&config.input_path)
        .with_context(|| format!("Failed to open {}", config.input_path.display()))?;

    let mut lines = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        serde_json::from_str::<serde_json::Value>(&line)
            .map_err(|source| ScrapeError::InvalidRecord { line: i + 1, source })?;
        lines.push(line);
    }
    Ok(lines)
}
