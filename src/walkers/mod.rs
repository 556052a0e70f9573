//! Page walkers: one pure extraction function per page shape.
//!
//! Every listing level of the archive (root index, year page, research
//! edition page, issue page) renders its children as the same repeated
//! "row card" element: an `li.row.card[role="presentation"]` holding a
//! `.cardTitleBlock` label and a link. [`row_cards`] reads that shape once and
//! the walkers in [`index`] filter and type the cards per level. Article pages
//! are handled by [`article`].
//!
//! | Page | Walker | Output |
//! |------|--------|--------|
//! | Root index | [`index::years`] | `Vec<YearEntry>` |
//! | Year page (2008+) | [`index::research_edition_url`] | `Option<String>` |
//! | Research edition page | [`index::monthly_issues`] | `Vec<IssueEntry>` |
//! | Year page (pre-2008) | [`index::fifteenth_day_issues`] | `Vec<IssueEntry>` |
//! | Issue page | [`index::articles`] | `Vec<ArticleEntry>` |
//! | Article page | [`article::question_content`] | `QuestionContent` |
//! | Article page | [`article::subtitle`] | `Option<String>` |
//!
//! Walkers never fail. A missing element gives an empty list, an empty string
//! or `None`, and the caller decides whether that matters.

pub mod article;
pub mod index;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ROW_CARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"li.row.card[role="presentation"]"#).expect("static selector"));
static CARD_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".cardTitleBlock").expect("static selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));

/// One labelled link of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCard {
    /// Trimmed text of the card's title block.
    pub label: String,
    /// Absolute link target, `None` when the card has no usable link.
    pub url: Option<String>,
}

/// Read every row card of a listing page, in document order.
pub fn row_cards(html: &str, base: &Url) -> Vec<RowCard> {
    let document = Html::parse_document(html);
    document
        .select(&ROW_CARD)
        .map(|card| RowCard {
            label: element_text(card, &CARD_TITLE),
            url: card
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(|u| u.to_string()),
        })
        .collect()
}

/// Concatenated, trimmed text of every `selector` match under `root`.
fn element_text(root: ElementRef<'_>, selector: &Selector) -> String {
    root.select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}
