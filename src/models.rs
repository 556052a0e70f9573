//! Data models for the archive hierarchy and the collected dataset.
//!
//! The archive is walked top-down and every level yields a list of typed
//! descriptors:
//! - [`YearEntry`]: one row of the root index
//! - [`IssueEntry`]: one issue of a year (monthly research edition or 15th-day issue)
//! - [`ArticleEntry`]: one article of an issue
//!
//! The walk ends in [`QuestionRecord`], the unit of value that is appended to
//! the cumulative dataset. [`CrawlProgress`] is the resume checkpoint.
//!
//! Field names are serialized in camelCase so that cache entries and the
//! dataset file stay readable by the downstream list viewer.

use serde::{Deserialize, Serialize};

/// A year row from the root index.
///
/// `source_url` is `None` when the row card carried no link; such a year is
/// kept in the list but contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearEntry {
    /// Four digit year label, e.g. `"2015"`.
    pub year: String,
    /// Absolute URL of the year page.
    #[serde(rename = "url")]
    pub source_url: Option<String>,
}

/// An issue of a given year.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssueEntry {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
}

/// An article listed on an issue page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleEntry {
    pub title: String,
    #[serde(rename = "url")]
    pub source_url: String,
}

/// What the question-content walker pulls out of an article page.
///
/// `title` is the text of the page's label region; it is cached together
/// with the split body but is not copied into the final record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionContent {
    pub title: String,
    pub question: String,
    pub answer: String,
}

/// One reader question with its answer.
///
/// Created once per candidate article. The enrichment pass may later fill in
/// `subtitle`; a record is never removed from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionRecord {
    pub year: String,
    /// Title of the issue the article appeared in.
    pub issue: String,
    /// Title of the article as listed on the issue page.
    pub title: String,
    pub url: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl QuestionRecord {
    /// Assemble a record from its place in the hierarchy and the extracted content.
    pub fn new(year: &str, issue: &IssueEntry, article: &ArticleEntry, content: QuestionContent) -> Self {
        Self {
            year: year.to_string(),
            issue: issue.title.clone(),
            title: article.title.clone(),
            url: article.source_url.clone(),
            question: content.question,
            answer: content.answer,
            subtitle: None,
        }
    }
}

/// The resume checkpoint, overwritten after every batch of years.
///
/// `last_processed_year_index` is the index of the first year that has *not*
/// been processed yet, so a resumed run starts exactly there.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    /// Number of records in the dataset when the checkpoint was taken.
    pub count: usize,
    pub last_processed_year_index: usize,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

/// Historical layout of a year's page.
///
/// From 2008 on, a year page links to a "research edition" page that lists
/// monthly issues. Before 2008 the year page lists issues directly and only
/// the 15th-day issues carry the question column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Era {
    ResearchEdition,
    FifteenthDay,
}

impl Era {
    pub const RESEARCH_EDITION_SINCE: u16 = 2008;

    pub fn for_year(year: u16) -> Self {
        if year >= Self::RESEARCH_EDITION_SINCE {
            Era::ResearchEdition
        } else {
            Era::FifteenthDay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> QuestionRecord {
        QuestionRecord {
            year: "2015".to_string(),
            issue: "2015년 1월호".to_string(),
            title: "독자의 질문".to_string(),
            url: "https://wol.jw.org/ko/wol/d/r8/lp-ko/2015helper".to_string(),
            question: "질문입니까?".to_string(),
            answer: "답변입니다.".to_string(),
            subtitle: None,
        }
    }

    #[test]
    fn test_record_omits_absent_subtitle() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(!json.contains("subtitle"));
    }

    #[test]
    fn test_record_keeps_present_subtitle() {
        let mut record = sample_record();
        record.subtitle = Some("부제".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""subtitle":"부제""#));
    }

    #[test]
    fn test_record_field_order_matches_dataset_layout() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        let year = json.find("\"year\"").unwrap();
        let issue = json.find("\"issue\"").unwrap();
        let answer = json.find("\"answer\"").unwrap();
        assert!(year < issue && issue < answer);
    }

    #[test]
    fn test_record_deserializes_without_subtitle() {
        let json = r#"{
            "year": "2003",
            "issue": "1월 15일호",
            "title": "독자로부터의 질문",
            "url": "https://example.com/a",
            "question": "q",
            "answer": "a"
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.subtitle, None);
        assert_eq!(record.year, "2003");
    }

    #[test]
    fn test_year_entry_uses_url_key() {
        let entry = YearEntry {
            year: "1999".to_string(),
            source_url: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"year":"1999","url":null}"#);
    }

    #[test]
    fn test_progress_uses_checkpoint_field_names() {
        let progress = CrawlProgress {
            count: 12,
            last_processed_year_index: 6,
            timestamp: "2025-02-28T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains(r#""count":12"#));
        assert!(json.contains(r#""lastProcessedYearIndex":6"#));
    }

    #[test]
    fn test_era_boundary() {
        assert_eq!(Era::for_year(2008), Era::ResearchEdition);
        assert_eq!(Era::for_year(2024), Era::ResearchEdition);
        assert_eq!(Era::for_year(2007), Era::FifteenthDay);
        assert_eq!(Era::for_year(1950), Era::FifteenthDay);
    }

    #[test]
    fn test_record_new_copies_hierarchy_fields() {
        let issue = IssueEntry {
            title: "3월호".to_string(),
            source_url: "https://example.com/i".to_string(),
        };
        let article = ArticleEntry {
            title: "독자의 질문".to_string(),
            source_url: "https://example.com/a".to_string(),
        };
        let content = QuestionContent {
            title: "label".to_string(),
            question: "q?".to_string(),
            answer: "a".to_string(),
        };
        let record = QuestionRecord::new("2012", &issue, &article, content);
        assert_eq!(record.issue, "3월호");
        assert_eq!(record.url, "https://example.com/a");
        assert_eq!(record.question, "q?");
        assert!(record.subtitle.is_none());
    }
}
