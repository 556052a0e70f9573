//! Walkers for the listing levels: root index, year pages, research edition
//! pages and issue pages.

use url::Url;

use super::row_cards;
use crate::config::Markers;
use crate::models::{ArticleEntry, IssueEntry, YearEntry};

/// Year rows of the root index.
///
/// A card counts as a year when its label contains the year prefix marker
/// immediately followed by four ASCII digits. A year card without a link is
/// kept with `source_url: None`.
pub fn years(html: &str, base: &Url, markers: &Markers) -> Vec<YearEntry> {
    row_cards(html, base)
        .into_iter()
        .filter_map(|card| {
            year_in_label(&card.label, &markers.year_prefix).map(|year| YearEntry {
                year,
                source_url: card.url,
            })
        })
        .collect()
}

fn year_in_label(label: &str, prefix: &str) -> Option<String> {
    label.match_indices(prefix).find_map(|(i, _)| {
        let digits: String = label[i + prefix.len()..].chars().take(4).collect();
        (digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
    })
}

/// Link to the research edition listed on a 2008+ year page.
///
/// When several cards carry the marker the last one wins.
pub fn research_edition_url(html: &str, base: &Url, markers: &Markers) -> Option<String> {
    row_cards(html, base)
        .into_iter()
        .filter(|card| card.label.contains(&markers.research_edition))
        .last()
        .and_then(|card| card.url)
}

/// Every issue of a research edition page.
pub fn monthly_issues(html: &str, base: &Url) -> Vec<IssueEntry> {
    linked_cards(html, base)
        .map(|(title, source_url)| IssueEntry { title, source_url })
        .collect()
}

/// The 15th-day issues of a pre-2008 year page.
pub fn fifteenth_day_issues(html: &str, base: &Url, markers: &Markers) -> Vec<IssueEntry> {
    linked_cards(html, base)
        .filter(|(title, _)| title.contains(&markers.fifteenth_day))
        .map(|(title, source_url)| IssueEntry { title, source_url })
        .collect()
}

/// Every article of an issue page.
pub fn articles(html: &str, base: &Url) -> Vec<ArticleEntry> {
    linked_cards(html, base)
        .map(|(title, source_url)| ArticleEntry { title, source_url })
        .collect()
}

/// Whether an article title names a reader-question column.
pub fn is_question_article(title: &str, markers: &Markers) -> bool {
    title.contains(&markers.reader) && title.contains(&markers.question)
}

/// Cards that have both a label and a link.
fn linked_cards(html: &str, base: &Url) -> impl Iterator<Item = (String, String)> {
    row_cards(html, base)
        .into_iter()
        .filter(|card| !card.label.is_empty())
        .filter_map(|card| card.url.map(|url| (card.label, url)))
}
