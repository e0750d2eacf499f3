pub mod detail;
pub mod listing;

use chrono::NaiveDate;
use scraper::ElementRef;

/// Output file name for a document published on `date`: `<prefix><YYYY-MM-DD>.<ext>`.
pub fn document_file_name(prefix: &str, date: NaiveDate, ext: &str) -> String {
    format!("{}{}.{}", prefix, date.format("%Y-%m-%d"), ext)
}

/// Whitespace-collapsed text content of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
