use anyhow::Result;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{HttpErrorPolicy, ScrapeConfig};
use crate::error::ScrapeError;
use crate::fetch::Fetcher;
use crate::parser;

/// Walk list pages `1..=config.page_num` and collect absolute detail-page URLs
/// in the order they appear.
pub async fn extract_detail_urls(
    fetcher: &dyn Fetcher,
    config: &ScrapeConfig,
    pb: &ProgressBar,
) -> Result<Vec<Url>> {
    let mut urls = Vec::new();
    let mut skipped = 0usize;

    for page in 1..=config.page_num {
        config.delay.wait().await;

        let list_url = config.listing_url(page);
        debug!("Fetching list page {}: {}", page, list_url);
        let response = fetcher.get(&list_url).await?;

        if !response.is_success() {
            match config.listing_errors {
                HttpErrorPolicy::Skip => {
                    warn!(
                        "The {}th list page is not available: status code {}",
                        page, response.status
                    );
                    skipped += 1;
                    pb.inc(1);
                    continue;
                }
                HttpErrorPolicy::Abort => {
                    return Err(ScrapeError::ListingUnavailable {
                        page,
                        status: response.status,
                    }
                    .into());
                }
            }
        }

        let hrefs = parser::listing::detail_hrefs(&response.text())?;
        debug!("List page {} has {} entries", page, hrefs.len());
        for href in hrefs {
            urls.push(config.resolve(&href)?);
        }
        pb.inc(1);
    }

    info!(
        "Collected {} detail page URLs from {} list pages ({} skipped)",
        urls.len(),
        config.page_num,
        skipped
    );
    Ok(urls)
}
