use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

/// A fetched response. Non-success statuses are returned, not raised;
/// each stage decides what a failed status means for it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. Only transport failures are errors.
    async fn get(&self, url: &Url) -> Result<Fetched>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<Fetched> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("HTTP request failed for {url}"))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;
        Ok(Fetched {
            status,
            body: body.to_vec(),
        })
    }
}
