use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ConvertConfig;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    pub files: usize,
    pub converted: usize,
    /// Tool exited non-zero. Its output file is kept as-is.
    pub nonzero_exit: usize,
}

/// Source files in `dir` with exactly the configured extension, sorted by name.
/// The match is case-sensitive: `X.hwp` and `X.HWP` would both write `X.txt`.
pub fn source_files(config: &ConvertConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&config.dir)
        .with_context(|| format!("Failed to read {}", config.dir.display()))?
    {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == config.ext);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the external converter once per source file, writing its stdout to a
/// sibling `.txt` file.
pub fn convert_dir(config: &ConvertConfig, pb: &ProgressBar) -> Result<ConvertStats> {
    let files = source_files(config)?;
    info!("Transforming {} {} files.", files.len(), config.ext);
    pb.set_length(files.len() as u64);

    let results: Vec<Result<bool>> = files
        .par_iter()
        .map(|file| {
            let ok = convert_one(&config.tool, file);
            pb.inc(1);
            ok
        })
        .collect();

    let mut stats = ConvertStats {
        files: files.len(),
        ..Default::default()
    };
    for result in results {
        if result? {
            stats.converted += 1;
        } else {
            stats.nonzero_exit += 1;
        }
    }
    Ok(stats)
}

/// Returns whether the tool exited successfully. Failing to start the tool at all is an error.
fn convert_one(tool: &str, file: &Path) -> Result<bool> {
    let out_path = file.with_extension("txt");
    let out = File::create(&out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;

    let status = Command::new(tool)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .status()
        .with_context(|| format!("Failed to run {tool} on {}", file.display()))?;

    if status.success() {
        debug!("{} -> {}", file.display(), out_path.display());
    } else {
        warn!("{} exited with {} on {}", tool, status, file.display());
    }
    Ok(status.success())
}
