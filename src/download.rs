use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::config::{HttpErrorPolicy, ScrapeConfig};
use crate::error::ScrapeError;
use crate::fetch::Fetcher;
use crate::parser::{self, detail};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadStats {
    pub pages: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What a detail page offers for download.
struct Target {
    url: Url,
    file_name: String,
}

/// Fetch each detail page and save its matching attachment under a date-keyed name.
pub async fn download_documents(
    fetcher: &dyn Fetcher,
    config: &ScrapeConfig,
    urls: &[Url],
    pb: &ProgressBar,
) -> Result<DownloadStats> {
    std::fs::create_dir_all(&config.save_dir)
        .with_context(|| format!("Failed to create {}", config.save_dir.display()))?;

    let mut stats = DownloadStats::default();

    for url in urls {
        config.delay.wait().await;
        stats.pages += 1;

        let page = fetcher.get(url).await?;
        if !page.is_success() {
            match config.detail_errors {
                HttpErrorPolicy::Abort => {
                    return Err(ScrapeError::DetailUnavailable {
                        url: url.to_string(),
                        status: page.status,
                    }
                    .into());
                }
                HttpErrorPolicy::Skip => {
                    warn!("Detail page {} is not available: status code {}", url, page.status);
                    stats.skipped += 1;
                    pb.inc(1);
                    continue;
                }
            }
        }

        let Some(target) = find_target(&page.text(), config)? else {
            info!("No {} file on {}", config.ext, url);
            stats.skipped += 1;
            pb.inc(1);
            continue;
        };

        let file = fetcher.get(&target.url).await?;
        if file.is_success() {
            let path = config.save_dir.join(&target.file_name);
            info!("saving to {}", absolute(&path).display());
            std::fs::write(&path, &file.body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            stats.saved += 1;
        } else {
            warn!(
                "Attachment {} is not available: status code {}",
                target.url, file.status
            );
            stats.failed += 1;
        }
        pb.inc(1);
    }

    info!(
        "Processed {} detail pages ({} saved, {} skipped, {} failed)",
        stats.pages, stats.saved, stats.skipped, stats.failed
    );
    Ok(stats)
}

/// Locate the first attachment matching the configured extension and name it
/// after the page's publication date. `None` when nothing matches.
fn find_target(html: &str, config: &ScrapeConfig) -> Result<Option<Target>, ScrapeError> {
    let document = Html::parse_document(html);
    let attachments = detail::attachments(&document)?;
    let Some(attachment) = detail::first_matching(&attachments, &config.ext) else {
        return Ok(None);
    };

    let date = detail::document_date(&document)?;
    Ok(Some(Target {
        url: config.resolve(&attachment.href)?,
        file_name: parser::document_file_name(&config.prefix, date, &config.ext),
    }))
}

fn absolute(path: &std::path::Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Delay, DEFAULT_ORIGIN};
    use crate::fetch::mock::MockFetcher;

    const HWP_BYTES: &[u8] = b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1HWP Document File";

    fn config(dir: &std::path::Path) -> ScrapeConfig {
        let mut cfg = ScrapeConfig::new(DEFAULT_ORIGIN, dir).unwrap();
        cfg.delay = Delay::none();
        cfg
    }

    fn detail_url(cfg: &ScrapeConfig, id: u32) -> Url {
        cfg.resolve(&format!("/portal/bbs/P0000093/view.do?nttId={id}&menuNo=200789"))
            .unwrap()
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
    }

    fn dir_entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn saves_matching_attachment_under_date() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let page = detail_url(&cfg, 1);
        let fetcher = MockFetcher::new()
            .route(&page, 200, fixture("detail_page.html"))
            .route("https://www.bok.or.kr/fileSrc/portal/report.pdf", 200, "%PDF-1.4")
            .route("https://www.bok.or.kr/fileSrc/portal/minutes.hwp", 200, HWP_BYTES);

        let stats = download_documents(&fetcher, &cfg, &[page], &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.saved, 1);
        assert_eq!(dir_entries(tmp.path()), ["MPD2021-01-15.hwp"]);
        let saved = std::fs::read(tmp.path().join("MPD2021-01-15.hwp")).unwrap();
        assert_eq!(saved, HWP_BYTES);
        // The pdf variant is never fetched
        assert!(!fetcher.requests().iter().any(|u| u.ends_with("report.pdf")));
    }

    #[tokio::test]
    async fn only_first_matching_attachment_is_fetched() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let page = detail_url(&cfg, 1);
        let html = r#"<div class="bd-view">
            <span class="date">등록일 2021.01.15</span>
            <div class="addfile">
                <a href="/fileSrc/portal/a.hwp">a.hwp</a>
                <a href="/fileSrc/portal/b.HWP">b.HWP</a>
            </div>
        </div>"#;
        let fetcher = MockFetcher::new()
            .route(&page, 200, html)
            .route("https://www.bok.or.kr/fileSrc/portal/a.hwp", 200, HWP_BYTES)
            .route("https://www.bok.or.kr/fileSrc/portal/b.HWP", 200, "second variant");

        let stats = download_documents(&fetcher, &cfg, &[page.clone()], &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.saved, 1);
        assert_eq!(
            fetcher.requests(),
            [page.to_string(), "https://www.bok.or.kr/fileSrc/portal/a.hwp".to_string()]
        );
        let saved = std::fs::read(tmp.path().join("MPD2021-01-15.hwp")).unwrap();
        assert_eq!(saved, HWP_BYTES);
    }

    #[tokio::test]
    async fn no_matching_attachment_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let page = detail_url(&cfg, 1);
        let fetcher = MockFetcher::new().route(&page, 200, fixture("detail_page_no_hwp.html"));

        let stats = download_documents(&fetcher, &cfg, &[page], &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.saved, 0);
        assert!(dir_entries(tmp.path()).is_empty());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_detail_page_halts_run() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let broken = detail_url(&cfg, 1);
        let next = detail_url(&cfg, 2);
        let fetcher = MockFetcher::new()
            .route(&broken, 500, "Internal Server Error")
            .route(&next, 200, fixture("detail_page.html"));

        let err = download_documents(&fetcher, &cfg, &[broken.clone(), next], &ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ScrapeError>(),
            Some(ScrapeError::DetailUnavailable { .. })
        ));
        assert_eq!(fetcher.requests(), [broken.to_string()]);
        assert!(dir_entries(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn skip_policy_continues_past_failed_detail_page() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config(tmp.path());
        cfg.detail_errors = HttpErrorPolicy::Skip;
        let broken = detail_url(&cfg, 1);
        let next = detail_url(&cfg, 2);
        let fetcher = MockFetcher::new()
            .route(&broken, 500, "")
            .route(&next, 200, fixture("detail_page.html"))
            .route("https://www.bok.or.kr/fileSrc/portal/minutes.hwp", 200, HWP_BYTES);

        let stats = download_documents(&fetcher, &cfg, &[broken, next], &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats, DownloadStats { pages: 2, saved: 1, skipped: 1, failed: 0 });
    }

    #[tokio::test]
    async fn failed_attachment_is_counted_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let page = detail_url(&cfg, 1);
        let fetcher = MockFetcher::new().route(&page, 200, fixture("detail_page.html"));

        let stats = download_documents(&fetcher, &cfg, &[page], &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert!(dir_entries(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&tmp.path().join("nested/out"));
        let page = detail_url(&cfg, 1);
        let fetcher = MockFetcher::new()
            .route(&page, 200, fixture("detail_page.html"))
            .route("https://www.bok.or.kr/fileSrc/portal/minutes.hwp", 200, HWP_BYTES);
        let path = cfg.save_dir.join("MPD2021-01-15.hwp");

        download_documents(&fetcher, &cfg, &[page.clone()], &ProgressBar::hidden())
            .await
            .unwrap();
        let first = std::fs::read(&path).unwrap();
        download_documents(&fetcher, &cfg, &[page], &ProgressBar::hidden())
            .await
            .unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(dir_entries(&cfg.save_dir), ["MPD2021-01-15.hwp"]);
    }
}
