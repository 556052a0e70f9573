//! Walkers for article pages.
//!
//! The question/answer split is positional: the first body paragraph is the
//! question, and the second joins it when the first has no question mark.
//! Everything after that is the answer. Questions that run longer than two
//! paragraphs end up partly in the answer; the dataset relies on exactly this
//! split, so it is kept as is.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::models::QuestionContent;

static LABEL_REGION: Lazy<Selector> = Lazy::new(|| Selector::parse(".docSubtitle, .pubRefs").expect("static selector"));
static BODY_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse(".bodyTxt p").expect("static selector"));
static SUBTITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article#article .sn").expect("static selector"));
static EMPHASIS: Lazy<Selector> = Lazy::new(|| Selector::parse("article#article strong").expect("static selector"));

const QUESTION_MARKS: [char; 2] = ['?', '？'];

/// Label text and question/answer split of an article page.
pub fn question_content(html: &str) -> QuestionContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&LABEL_REGION)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let paragraphs: Vec<String> = document
        .select(&BODY_PARAGRAPH)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect();
    let (question, answer) = split_question_answer(&paragraphs);

    QuestionContent { title, question, answer }
}

/// Partition body paragraphs into `(question, answer)`.
///
/// Each part is its paragraphs joined with a single space, trimmed.
pub fn split_question_answer(paragraphs: &[String]) -> (String, String) {
    let mut question = String::new();
    let mut answer = String::new();

    for (i, text) in paragraphs.iter().enumerate() {
        let part = if i == 0 || (i == 1 && !question.contains(QUESTION_MARKS)) {
            &mut question
        } else {
            &mut answer
        };
        part.push(' ');
        part.push_str(text);
    }

    (question.trim().to_string(), answer.trim().to_string())
}

/// Subtitle of an article page for the enrichment pass.
///
/// Reads the first `.sn` region of the article; if it is empty, falls back
/// to the article's first `strong` text.
pub fn subtitle(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let first_text = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    first_text(&SUBTITLE).or_else(|| first_text(&EMPHASIS))
}
