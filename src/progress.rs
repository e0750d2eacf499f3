use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a known number of steps, labelled with `desc`.
pub fn bar(len: u64, desc: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}: [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );
    pb.set_message(desc);
    Ok(pb)
}
