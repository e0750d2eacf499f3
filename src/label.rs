use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::LabelConfig;
use crate::error::ScrapeError;

/// date, text, major_direction, voting, minor_direction
const COLUMNS: usize = 5;

/// One annotated decision, as written to the labeled JSONL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledRecord {
    pub date: String,
    pub text: String,
    pub major_direction: String,
    pub voting: String,
    pub minor_direction: String,
    pub label_major: u8,
    pub label_minor: u8,
}

/// fall → 0, freeze → 1, anything else → 2.
pub fn major_label(direction: &str) -> u8 {
    match direction {
        "fall" => 0,
        "freeze" => 1,
        _ => 2,
    }
}

/// fall → 0, freeze → 1, rise → 2, anything else → 3.
pub fn minor_label(direction: &str) -> u8 {
    match direction {
        "fall" => 0,
        "freeze" => 1,
        "rise" => 2,
        _ => 3,
    }
}

impl LabeledRecord {
    fn from_row(row: &csv::StringRecord) -> Result<Self, ScrapeError> {
        if row.len() < COLUMNS {
            return Err(ScrapeError::MissingColumns {
                line: row.position().map_or(0, |p| p.line()),
                found: row.len(),
                expected: COLUMNS,
            });
        }
        let col = |i: usize| row[i].trim().to_string();
        let (major_direction, minor_direction) = (col(2), col(4));
        Ok(Self {
            date: col(0),
            text: col(1),
            label_major: major_label(&major_direction),
            label_minor: minor_label(&minor_direction),
            major_direction,
            voting: col(3),
            minor_direction,
        })
    }
}

/// Read the annotated CSV (header row skipped) and write one labeled JSON
/// record per row.
pub fn label_file(config: &LabelConfig) -> Result<usize> {
    info!("Labeling {}", config.input_path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&config.input_path)
        .with_context(|| format!("Failed to open {}", config.input_path.display()))?;

    let out = File::create(&config.output_path)
        .with_context(|| format!("Failed to create {}", config.output_path.display()))?;
    let mut writer = BufWriter::new(out);

    let mut count = 0usize;
    for row in reader.records() {
        let row = row.with_context(|| format!("Failed to read {}", config.input_path.display()))?;
        let record = LabeledRecord::from_row(&row)?;
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;

    info!("Wrote {} labeled records to {}", count, config.output_path.display());
    Ok(count)
}
