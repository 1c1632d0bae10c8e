//! Article page fetching.
//!
//! A [`ContentFetcher`] turns an article URL into a [`FetchOutcome`]. It never
//! fails: transport errors, bad statuses and undecodable bodies all become
//! [`FetchOutcome::Failed`], so the processor always has something to work
//! with. [`FetchOutcome`] keeps real and placeholder data apart while still
//! offering the placeholder strings older records were written with.
//!
//! [`HtmlFetcher`] extracts fields with generic selector fallbacks (Open
//! Graph metadata first, then common article markup).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const CONTENT_NOT_EXTRACTED: &str = "Content could not be extracted";
pub const DATE_NOT_FOUND: &str = "Date not found";
pub const TITLE_FETCH_FAILED: &str = "Error extracting title";

/// Fields scraped from an article page. `None` means the page had no match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<String>,
}

/// Result of fetching one article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(FetchedPage),
    Failed { reason: String },
}

impl FetchOutcome {
    /// Scraped title, or the matching placeholder.
    pub fn title(&self) -> String {
        match self {
            FetchOutcome::Fetched(page) => page
                .title
                .clone()
                .unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
            FetchOutcome::Failed { .. } => TITLE_FETCH_FAILED.to_string(),
        }
    }

    /// Article body, or the matching placeholder.
    pub fn content(&self) -> String {
        match self {
            FetchOutcome::Fetched(page) => page
                .content
                .clone()
                .unwrap_or_else(|| CONTENT_NOT_EXTRACTED.to_string()),
            FetchOutcome::Failed { reason } => format!("Error fetching content: {reason}"),
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched(page) => page.image_url.as_deref(),
            FetchOutcome::Failed { .. } => None,
        }
    }

    /// Publication date as shown on the page, or the placeholder.
    pub fn published(&self) -> String {
        match self {
            FetchOutcome::Fetched(page) => page
                .published
                .clone()
                .unwrap_or_else(|| DATE_NOT_FOUND.to_string()),
            FetchOutcome::Failed { .. } => DATE_NOT_FOUND.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }
}

/// Fetches and scrapes a single article.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> FetchOutcome;
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
}

static TITLE_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&[r#"meta[property="og:title"]"#, "h1", "title"]));
static DATE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "time[datetime]",
        r#"meta[property="article:published_time"]"#,
        "time",
    ])
});
static CONTENT_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["article p", "main p", "p"]));
static IMAGE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"meta[property="og:image"]"#,
        "article img",
        "figure img",
    ])
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Paragraphs this short are bylines, captions or share buttons.
const MIN_PARAGRAPH_CHARS: usize = 21;

fn element_text(element: &ElementRef<'_>) -> String {
    let raw = element.text().collect::<Vec<_>>().join(" ");
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// Text of a `<meta content>` or the element's own text.
fn meta_or_text(element: &ElementRef<'_>) -> Option<String> {
    let value = match element.value().name() {
        "meta" => element.value().attr("content").map(|c| c.trim().to_string()),
        _ => Some(element_text(element)),
    };
    value.filter(|v| !v.is_empty())
}

fn first_match<F>(document: &Html, list: &[Selector], pick: F) -> Option<String>
where
    F: Fn(&ElementRef<'_>) -> Option<String>,
{
    list.iter()
        .flat_map(|selector| document.select(selector))
        .find_map(|element| pick(&element))
}

/// Parse an article page into its fields.
///
/// Content comes from the first selector that yields at least one
/// paragraph long enough to keep; later selectors are not mixed in.
pub fn parse_article_page(html: &str, page_url: &Url) -> FetchedPage {
    let document = Html::parse_document(html);

    let title = first_match(&document, &TITLE_SELECTORS, meta_or_text);

    let published = first_match(&document, &DATE_SELECTORS, |element| {
        element
            .value()
            .attr("datetime")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .or_else(|| meta_or_text(element))
    });

    let content = CONTENT_SELECTORS.iter().find_map(|selector| {
        let paragraphs: Vec<String> = document
            .select(selector)
            .map(|p| element_text(&p))
            .filter(|text| text.chars().count() >= MIN_PARAGRAPH_CHARS)
            .collect();
        (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"))
    });

    let image_url = first_match(&document, &IMAGE_SELECTORS, |element| {
        let value = element.value();
        let raw = match value.name() {
            "meta" => value.attr("content"),
            _ => value.attr("src").or_else(|| value.attr("data-src")),
        }?;
        page_url.join(raw.trim()).ok().map(|u| u.to_string())
    });

    FetchedPage {
        title,
        content,
        image_url,
        published,
    }
}

/// [`ContentFetcher`] over HTTP with generic HTML extraction.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: Client,
    timeout: Duration,
}

impl HtmlFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn try_fetch(&self, url: &str, headers: &HeaderMap) -> Result<FetchedPage, String> {
        let page_url = Url::parse(url).map_err(|e| e.to_string())?;
        let response = self
            .client
            .get(page_url.clone())
            .headers(headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let body = response.text().await.map_err(|e| e.to_string())?;
        debug!(bytes = body.len(), "Downloaded article page");
        Ok(parse_article_page(&body, &page_url))
    }
}

#[async_trait]
impl ContentFetcher for HtmlFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> FetchOutcome {
        match self.try_fetch(url, headers).await {
            Ok(page) => {
                info!(
                    has_title = page.title.is_some(),
                    content_chars = page.content.as_ref().map_or(0, |c| c.chars().count()),
                    "Parsed article page"
                );
                FetchOutcome::Fetched(page)
            }
            Err(reason) => {
                warn!(%reason, "Article fetch failed");
                FetchOutcome::Failed { reason }
            }
        }
    }
}
