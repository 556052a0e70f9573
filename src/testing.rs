//! In-memory archive for tests: page builders and a recording fake source.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetch::PageSource;
use crate::models::QuestionRecord;

pub const BASE: &str = "https://wol.test";
pub const START: &str = "https://wol.test/ko/wol/lv/r8/lp-ko/0/20383";

/// A listing page made of row cards; `None` leaves the card without a link.
pub fn listing_page(cards: &[(&str, Option<&str>)]) -> String {
    let items: String = cards
        .iter()
        .map(|(label, href)| {
            let title = format!(r#"<div class="cardTitleBlock">{label}</div>"#);
            let inner = match href {
                Some(href) => format!(r#"<a href="{href}">{title}</a>"#),
                None => title,
            };
            format!(r#"<li class="row card" role="presentation">{inner}</li>"#)
        })
        .collect();
    format!("<html><body><ul class=\"directory\">{items}</ul></body></html>")
}

pub fn article_page(label: Option<&str>, subtitle: Option<&str>, paragraphs: &[&str]) -> String {
    let label = label
        .map(|l| format!(r#"<p class="docSubtitle">{l}</p>"#))
        .unwrap_or_default();
    let subtitle = subtitle
        .map(|s| format!(r#"<p class="sn">{s}</p>"#))
        .unwrap_or_default();
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    let article = format!(r#"{label}{subtitle}<div class="bodyTxt">{body}</div>"#);
    format!(r#"<html><body><article id="article">{article}</article></body></html>"#)
}

pub fn record(year: &str, issue: &str, slug: &str) -> QuestionRecord {
    QuestionRecord {
        year: year.to_string(),
        issue: issue.to_string(),
        title: "독자의 질문".to_string(),
        url: format!("{BASE}/a/{slug}"),
        question: format!("{slug}?"),
        answer: format!("answer {slug}"),
        subtitle: None,
    }
}

/// Serves pages from a map, records every requested URL and fails on demand.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, path: &str, html: String) -> Self {
        self.pages.insert(absolute(path), html);
        self
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(absolute(path));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested(&self, path: &str) -> bool {
        let url = absolute(path);
        self.requests.lock().unwrap().iter().any(|r| *r == url)
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

fn absolute(path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{BASE}{path}")
    }
}

impl PageSource for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Holds back the responses of chosen URLs so that a concurrent group
/// completes out of order.
pub struct SlowSite {
    inner: FakeSite,
    delays: HashMap<String, Duration>,
}

impl SlowSite {
    pub fn new(inner: FakeSite) -> Self {
        Self {
            inner,
            delays: HashMap::new(),
        }
    }

    pub fn delay(mut self, path: &str, by: Duration) -> Self {
        self.delays.insert(absolute(path), by);
        self
    }

    pub fn site(&self) -> &FakeSite {
        &self.inner
    }
}

impl PageSource for SlowSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(by) = self.delays.get(url) {
            tokio::time::sleep(*by).await;
        }
        self.inner.fetch(url).await
    }
}

/// A small two-era archive.
///
/// - 2010 (research edition era): two monthly issues, one question each.
/// - 2005 (15th-day era): the 1st-day issue is skipped, the 15th-day issue has one question.
/// - A year card without a link and a non-year card on the root index.
pub fn archive() -> FakeSite {
    FakeSite::new()
        .with_page(
            START,
            listing_page(&[
                ("파수대—2010", Some("/y/2010")),
                ("파수대—2005", Some("/y/2005")),
                ("파수대—1990", None),
                ("깨어라!—2010", Some("/g/2010")),
            ]),
        )
        .with_page(
            "/y/2010",
            listing_page(&[("파수대 (일반용)", Some("/p/2010")), ("파수대 (연구용)", Some("/r/2010"))]),
        )
        .with_page(
            "/r/2010",
            listing_page(&[("2010년 1월 15일호", Some("/i/2010-01")), ("2010년 2월 15일호", Some("/i/2010-02"))]),
        )
        .with_page(
            "/i/2010-01",
            listing_page(&[("표지 기사", Some("/a/2010-01-cover")), ("독자의 질문", Some("/a/2010-01-q"))]),
        )
        .with_page(
            "/i/2010-02",
            listing_page(&[("독자의 질문", Some("/a/2010-02-q")), ("세계 소식", Some("/a/2010-02-news"))]),
        )
        .with_page(
            "/a/2010-01-q",
            article_page(Some("2010년 1월"), Some("부활"), &["부활은 언제입니까?", "성서는 말합니다.", "결론."]),
        )
        .with_page(
            "/a/2010-02-q",
            article_page(Some("2010년 2월"), None, &["헌금에 관하여", "무엇이 적절한가?", "원칙."]),
        )
        .with_page(
            "/y/2005",
            listing_page(&[("2005년 1월 1일호", Some("/i/2005-0101")), ("2005년 1월 15일호", Some("/i/2005-0115"))]),
        )
        .with_page(
            "/i/2005-0115",
            listing_page(&[("독자로부터의 질문", Some("/a/2005-0115-q"))]),
        )
        .with_page(
            "/a/2005-0115-q",
            article_page(Some("2005년 1월 15일"), Some("양심"), &["양심이란?", "내적 감각입니다."]),
        )
}
