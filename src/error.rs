use reqwest::StatusCode;
use thiserror::Error;

/// Failures the pipeline treats as fatal for a run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("list page {page} is not available: status code {status}")]
    ListingUnavailable { page: u32, status: StatusCode },

    #[error("detail page {url} is not available: status code {status}")]
    DetailUnavailable { url: String, status: StatusCode },

    /// Markup no longer matches the selectors the scraper relies on.
    #[error("page structure changed: {0}")]
    StructureChanged(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("line {line} has {found} columns, expected {expected}")]
    MissingColumns {
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("line {line} is not a JSON record: {source}")]
    InvalidRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
