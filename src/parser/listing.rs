use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::ScrapeError;

/// One search result on the list page.
static ENTRY_MARKER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.col.m10.s10.x9.ctBx").expect("constant selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("constant selector"));

/// Detail-page hrefs in document order, one per entry marker.
///
/// A marker without a link means the list markup has changed, which is
/// fatal: silently dropping entries would leave holes in the dataset.
pub fn detail_hrefs(html: &str) -> Result<Vec<String>, ScrapeError> {
    let document = Html::parse_document(html);
    document
        .select(&ENTRY_MARKER)
        .enumerate()
        .map(|(i, marker)| {
            marker
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.trim().to_string())
                .filter(|href| !href.is_empty())
                .ok_or_else(|| {
                    ScrapeError::StructureChanged(format!(
                        "entry {} on list page has no detail link",
                        i + 1
                    ))
                })
        })
        .collect()
}
