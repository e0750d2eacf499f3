mod config;
mod convert;
mod download;
mod error;
mod fetch;
mod label;
mod listing;
mod parser;
mod progress;
mod split;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use config::{
    ConvertConfig, Delay, HttpErrorPolicy, LabelConfig, ScrapeConfig, SplitConfig, DEFAULT_ORIGIN,
};
use fetch::HttpFetcher;

#[derive(Parser)]
#[command(
    name = "mpd_scraper",
    about = "Bank of Korea monetary policy decision scraper and dataset tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape list pages, then download every matching attachment
    Scrape {
        /// Directory to save documents into (created if absent)
        #[arg(long)]
        save_dir: PathBuf,
        #[command(flatten)]
        net: NetArgs,
        /// Attachment extension to download
        #[arg(long, default_value = "hwp")]
        ext: String,
        /// File name prefix, followed by the document date
        #[arg(long, default_value = "MPD")]
        prefix: String,
        /// What to do when a detail page returns an error status
        #[arg(long, value_enum, default_value = "abort")]
        detail_errors: HttpErrorPolicy,
    },
    /// Print detail page URLs found on the list pages
    Urls {
        #[command(flatten)]
        net: NetArgs,
    },
    /// Convert downloaded documents to text with an external tool
    Convert {
        /// Directory holding the documents; .txt files are written alongside
        #[arg(long)]
        dir: PathBuf,
        /// Source extension to convert
        #[arg(long, default_value = "hwp")]
        ext: String,
        /// Converter that prints a file's text to stdout
        #[arg(long, default_value = "hwp5txt")]
        tool: String,
    },
    /// Turn the annotated CSV into labeled JSONL records
    Label {
        /// Annotated CSV (date, text, major_direction, voting, minor_direction)
        #[arg(long)]
        input_path: PathBuf,
        /// Labeled JSONL output
        #[arg(long)]
        output_path: PathBuf,
    },
    /// Split a labeled JSONL file into train/dev/test sets
    Split {
        /// Path to the labeled records
        #[arg(long)]
        input_path: PathBuf,
        /// Directory to save the splits
        #[arg(long)]
        save_dir: PathBuf,
        /// Shuffle before splitting
        #[arg(long)]
        random: bool,
        /// Fraction of records for the development set
        #[arg(long, default_value_t = 0.1)]
        ratio_dev: f64,
        /// Fraction of records for the test set
        #[arg(long, default_value_t = 0.1)]
        ratio_test: f64,
        /// Shuffle seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

/// Flags shared by every command that talks to the site.
#[derive(Args)]
struct NetArgs {
    /// Number of list pages to scrape
    #[arg(short = 'n', long, default_value_t = 25)]
    page_num: u32,
    /// Site origin that list and detail links are resolved against
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    origin: String,
    /// Lower bound of the random pause before each request, in seconds
    #[arg(long, default_value_t = 1.0)]
    min_delay: f64,
    /// Upper bound of the random pause before each request, in seconds
    #[arg(long, default_value_t = 5.0)]
    max_delay: f64,
    /// What to do when a list page returns an error status
    #[arg(long, value_enum, default_value = "skip")]
    listing_errors: HttpErrorPolicy,
    /// Per-request timeout in seconds (default: none)
    #[arg(long)]
    timeout: Option<f64>,
}

impl NetArgs {
    fn into_config(self, save_dir: PathBuf) -> anyhow::Result<ScrapeConfig> {
        let mut cfg = ScrapeConfig::new(&self.origin, save_dir)?;
        cfg.page_num = self.page_num;
        cfg.delay = Delay::from_secs_f64(self.min_delay, self.max_delay)?;
        cfg.listing_errors = self.listing_errors;
        cfg.timeout = self
            .timeout
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid timeout: {e}"))?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape {
            save_dir,
            net,
            ext,
            prefix,
            detail_errors,
        } => {
            let mut cfg = net.into_config(save_dir)?;
            cfg.ext = ext.trim().to_string();
            cfg.prefix = prefix;
            cfg.detail_errors = detail_errors;
            cfg.validate()?;
            let fetcher = HttpFetcher::new(cfg.timeout)?;

            info!("Scraping {} list pages.", cfg.page_num);
            let pb = progress::bar(cfg.page_num as u64, "scraping")?;
            let urls = listing::extract_detail_urls(&fetcher, &cfg, &pb).await?;
            pb.finish_and_clear();

            info!(
                "Downloading {} files from url to {}",
                urls.len(),
                cfg.save_dir.display()
            );
            let pb = progress::bar(urls.len() as u64, "downloading")?;
            let stats = download::download_documents(&fetcher, &cfg, &urls, &pb).await?;
            pb.finish_and_clear();

            println!(
                "Done: {} detail pages ({} saved, {} skipped, {} failed).",
                stats.pages, stats.saved, stats.skipped, stats.failed
            );
            Ok(())
        }
        Commands::Urls { net } => {
            let cfg = net.into_config(PathBuf::new())?;
            cfg.validate()?;
            let fetcher = HttpFetcher::new(cfg.timeout)?;

            let pb = progress::bar(cfg.page_num as u64, "scraping")?;
            let urls = listing::extract_detail_urls(&fetcher, &cfg, &pb).await?;
            pb.finish_and_clear();

            for url in &urls {
                println!("{url}");
            }
            Ok(())
        }
        Commands::Convert { dir, ext, tool } => {
            let cfg = ConvertConfig { dir, ext, tool };
            cfg.validate()?;

            let pb = progress::bar(0, "transforming")?;
            let stats = convert::convert_dir(&cfg, &pb)?;
            pb.finish_and_clear();

            println!(
                "Converted {} of {} files ({} exited with an error).",
                stats.converted, stats.files, stats.nonzero_exit
            );
            Ok(())
        }
        Commands::Label {
            input_path,
            output_path,
        } => {
            let cfg = LabelConfig {
                input_path,
                output_path,
            };
            cfg.validate()?;

            let count = label::label_file(&cfg)?;
            println!(
                "Labeled {} records into {}.",
                count,
                cfg.output_path.display()
            );
            Ok(())
        }
        Commands::Split {
            input_path,
            save_dir,
            random,
            ratio_dev,
            ratio_test,
            seed,
        } => {
            let cfg = SplitConfig {
                input_path,
                save_dir,
                random,
                ratio_dev,
                ratio_test,
                seed,
            };
            cfg.validate()?;

            let counts = split::split_dataset(&cfg)?;
            println!(
                "Split into {} train, {} dev, {} test records under {}.",
                counts.train,
                counts.dev,
                counts.test,
                cfg.save_dir.display()
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
