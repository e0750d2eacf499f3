use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use crate::error::ScrapeError;

pub const DEFAULT_ORIGIN: &str = "https://www.bok.or.kr";
const LISTING_PATH: &str = "/portal/bbs/P0000093/list.do";
/// "통화정책방향" (monetary policy direction) search on the press-release board.
const LISTING_QUERY: &[(&str, &str)] = &[
    ("menuNo", "200789"),
    ("searchWrd", "통화정책방향"),
    ("searchCnd", "1"),
    ("sdate", ""),
    ("edate", ""),
];

/// What to do when an endpoint answers with a non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HttpErrorPolicy {
    /// Log and move on to the next page.
    Skip,
    /// Stop the run with an error.
    Abort,
}

/// Randomized pause inserted before every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delay {
    pub min: Duration,
    pub max: Duration,
}

impl Delay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn from_secs_f64(min: f64, max: f64) -> Result<Self, ScrapeError> {
        let to_duration = |secs: f64, name: &str| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                ScrapeError::InvalidConfig(format!(
                    "{name} must be a non-negative number of seconds, got {secs}"
                ))
            })
        };
        Ok(Self::new(to_duration(min, "min delay")?, to_duration(max, "max delay")?))
    }

    /// Draw a duration uniformly from `[min, max]`.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let span = (self.max - self.min).as_millis() as u64;
        self.min + Duration::from_millis(fastrand::u64(0..=span))
    }

    pub async fn wait(&self) {
        let pause = self.sample();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5))
    }
}

/// Everything the extractor and downloader need, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub origin: Url,
    pub page_num: u32,
    pub save_dir: PathBuf,
    pub ext: String,
    pub prefix: String,
    pub delay: Delay,
    pub listing_errors: HttpErrorPolicy,
    pub detail_errors: HttpErrorPolicy,
    pub timeout: Option<Duration>,
}

impl ScrapeConfig {
    pub fn new(origin: &str, save_dir: impl Into<PathBuf>) -> Result<Self, ScrapeError> {
        let origin = Url::parse(origin)
            .map_err(|e| ScrapeError::InvalidConfig(format!("bad origin {origin:?}: {e}")))?;
        Ok(Self {
            origin,
            page_num: 25,
            save_dir: save_dir.into(),
            ext: "hwp".to_string(),
            prefix: "MPD".to_string(),
            delay: Delay::default(),
            listing_errors: HttpErrorPolicy::Skip,
            detail_errors: HttpErrorPolicy::Abort,
            timeout: None,
        })
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.origin.cannot_be_a_base() {
            return Err(ScrapeError::InvalidConfig(format!(
                "origin {} cannot be used as a base URL",
                self.origin
            )));
        }
        if self.ext.is_empty() {
            return Err(ScrapeError::InvalidConfig("extension must not be empty".into()));
        }
        if self.ext.trim() != self.ext {
            return Err(ScrapeError::InvalidConfig(format!(
                "extension {:?} has surrounding whitespace",
                self.ext
            )));
        }
        if self.ext.contains(['/', '\\']) || self.prefix.contains(['/', '\\']) {
            return Err(ScrapeError::InvalidConfig(
                "extension and prefix must not contain path separators".into(),
            ));
        }
        if self.prefix.is_empty() {
            return Err(ScrapeError::InvalidConfig("file prefix must not be empty".into()));
        }
        if self.delay.min > self.delay.max {
            return Err(ScrapeError::InvalidConfig(format!(
                "min delay {:?} exceeds max delay {:?}",
                self.delay.min, self.delay.max
            )));
        }
        Ok(())
    }

    /// Search-results page `page` (1-based) of the listing endpoint.
    pub fn listing_url(&self, page: u32) -> Url {
        let mut url = self.origin.clone();
        url.set_path(LISTING_PATH);
        url.query_pairs_mut()
            .clear()
            .extend_pairs(LISTING_QUERY)
            .append_pair("pageIndex", &page.to_string());
        url
    }

    /// Resolve an href scraped from the site against the origin.
    pub fn resolve(&self, href: &str) -> Result<Url, ScrapeError> {
        self.origin
            .join(href.trim())
            .map_err(|e| ScrapeError::StructureChanged(format!("unusable link {href:?}: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub dir: PathBuf,
    pub ext: String,
    pub tool: String,
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if !self.dir.is_dir() {
            return Err(ScrapeError::InvalidConfig(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        if self.ext.is_empty() || self.ext.eq_ignore_ascii_case("txt") {
            return Err(ScrapeError::InvalidConfig(format!(
                "cannot convert files with extension {:?}",
                self.ext
            )));
        }
        if self.tool.trim().is_empty() {
            return Err(ScrapeError::InvalidConfig("converter tool must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LabelConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl LabelConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.input_path == self.output_path {
            return Err(ScrapeError::InvalidConfig(format!(
                "output {} would overwrite the input",
                self.output_path.display()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub input_path: PathBuf,
    pub save_dir: PathBuf,
    pub random: bool,
    pub ratio_dev: f64,
    pub ratio_test: f64,
    pub seed: u64,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), ScrapeError> {
        for (name, ratio) in [("dev", self.ratio_dev), ("test", self.ratio_test)] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ScrapeError::InvalidConfig(format!(
                    "{name} ratio must be within [0, 1], got {ratio}"
                )));
            }
        }
        if self.ratio_dev + self.ratio_test > 1.0 {
            return Err(ScrapeError::InvalidConfig(format!(
                "dev + test ratios exceed 1 ({} + {})",
                self.ratio_dev, self.ratio_test
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScrapeConfig {
        ScrapeConfig::new(DEFAULT_ORIGIN, "data").unwrap()
    }

    #[test]
    fn listing_url_carries_search_and_page_index() {
        let url = config().listing_url(3);
        assert_eq!(url.path(), LISTING_PATH);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("searchWrd".into(), "통화정책방향".into())));
        assert!(pairs.contains(&("menuNo".into(), "200789".into())));
        assert_eq!(pairs.last().unwrap(), &("pageIndex".into(), "3".into()));
    }

    #[test]
    fn resolve_prefixes_origin() {
        let url = config()
            .resolve("/portal/bbs/P0000093/view.do?nttId=10061&menuNo=200789")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.bok.or.kr/portal/bbs/P0000093/view.do?nttId=10061&menuNo=200789"
        );
    }

    #[test]
    fn delay_sample_stays_in_range() {
        let delay = Delay::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..100 {
            let d = delay.sample();
            assert!(d >= delay.min && d <= delay.max);
        }
        assert_eq!(Delay::none().sample(), Duration::ZERO);
    }

    #[test]
    fn rejects_inverted_delay() {
        let mut cfg = config();
        cfg.delay = Delay::from_secs_f64(5.0, 1.0).unwrap();
        assert!(matches!(cfg.validate(), Err(ScrapeError::InvalidConfig(_))));
        assert!(Delay::from_secs_f64(-1.0, 1.0).is_err());
    }

    #[test]
    fn rejects_empty_extension() {
        let mut cfg = config();
        cfg.ext = "".into();
        assert!(cfg.validate().is_err());
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_padded_extension() {
        for ext in [" hwp", "hwp ", " "] {
            let mut cfg = config();
            cfg.ext = ext.into();
            assert!(matches!(cfg.validate(), Err(ScrapeError::InvalidConfig(_))), "{ext:?}");
        }
    }

    #[test]
    fn label_output_must_differ_from_input() {
        let cfg = LabelConfig {
            input_path: "annotated.csv".into(),
            output_path: "annotated.csv".into(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn split_ratios_must_fit() {
        let mut cfg = SplitConfig {
            input_path: "labeled.jsonl".into(),
            save_dir: "splits".into(),
            random: false,
            ratio_dev: 0.1,
            ratio_test: 0.1,
            seed: 42,
        };
        assert!(cfg.validate().is_ok());
        cfg.ratio_dev = 0.6;
        cfg.ratio_test = 0.6;
        assert!(cfg.validate().is_err());
        cfg.ratio_test = -0.1;
        assert!(cfg.validate().is_err());
    }
}
