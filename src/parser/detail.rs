use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};

use super::element_text;
use crate::error::ScrapeError;

static ATTACHMENT_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.addfile a").expect("constant selector"));
static ATTACHMENT_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.addfile").expect("constant selector"));
static DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.date").expect("constant selector"));
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\.\s*(\d{1,2})\.\s*(\d{1,2})").expect("constant regex"));

/// A downloadable file variant listed on a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub label: String,
    pub href: String,
}

pub fn attachments(document: &Html) -> Result<Vec<Attachment>, ScrapeError> {
    if document.select(&ATTACHMENT_CONTAINER).next().is_none() {
        return Err(ScrapeError::StructureChanged(
            "detail page has no attachment container".into(),
        ));
    }

    Ok(document
        .select(&ATTACHMENT_LINKS)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(Attachment {
                label: element_text(a),
                href: href.to_string(),
            })
        })
        .collect())
}

/// First attachment whose label mentions `ext`, ignoring case.
pub fn first_matching<'a>(attachments: &'a [Attachment], ext: &str) -> Option<&'a Attachment> {
    let ext = ext.to_lowercase();
    attachments
        .iter()
        .find(|a| a.label.to_lowercase().contains(&ext))
}

/// Publication date shown in the page header, e.g. "등록일 2021.01.15".
pub fn document_date(document: &Html) -> Result<NaiveDate, ScrapeError> {
    let text = document
        .select(&DATE)
        .next()
        .map(element_text)
        .ok_or_else(|| ScrapeError::StructureChanged("detail page has no date element".into()))?;

    let caps = DATE_PATTERN
        .captures_iter(&text)
        .last()
        .ok_or_else(|| ScrapeError::StructureChanged(format!("no date in {text:?}")))?;

    let part = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
    NaiveDate::from_ymd_opt(part(1) as i32, part(2), part(3))
        .ok_or_else(|| ScrapeError::StructureChanged(format!("invalid date in {text:?}")))
}
