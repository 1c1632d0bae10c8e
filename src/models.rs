//! Data models for candidates, per-article results and stored records.
//!
//! - [`ArticleCandidate`]: one feed/sitemap entry waiting to be processed
//! - [`ProcessingResult`]: the terminal outcome for one candidate
//! - [`StoredArticle`]: the record written to the article store, keyed by title
//!
//! Field names of [`ArticleCandidate`] and [`StoredArticle`] follow the
//! persisted JSON layout (`pubDate`, `publisheddate`) so files written by the
//! feed collaborators and read by the query side stay compatible.

use crate::utils::truncate_excerpt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outlet a candidate was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Source {
    #[serde(rename = "BBC")]
    Bbc,
    #[serde(rename = "AJ")]
    AlJazeera,
}

impl Source {
    /// Short tag persisted in the `source` column.
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Bbc => "BBC",
            Source::AlJazeera => "AJ",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A feed or sitemap entry identifying one article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleCandidate {
    /// Headline as published in the feed.
    pub title: String,
    /// Article URL.
    pub link: String,
    /// Publication timestamp, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    /// Thumbnail advertised by the feed, if any.
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub source: Source,
}

/// Terminal classification of one processed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Skipped,
    ParsingError,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Skipped => "skipped",
            Status::ParsingError => "parsing_error",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Fields pulled out of the model output. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedData {
    pub insights: String,
    pub summary: String,
    pub gen_title: String,
}

impl fmt::Display for ExtractedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insights={:?}, summary={:?}, gen_title={:?}",
            self.insights, self.summary, self.gen_title
        )
    }
}

/// Outcome of processing one [`ArticleCandidate`].
///
/// Created once by the processor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessingResult {
    pub status: Status,
    pub title: String,
    pub url: String,
    pub message: String,
    /// First 500 characters of the raw model output, for parsing errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,
}

impl ProcessingResult {
    fn new(status: Status, title: &str, url: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            title: title.to_string(),
            url: url.to_string(),
            message: message.into(),
            llm_output: None,
            extracted_data: None,
        }
    }

    pub fn success(title: &str, url: &str) -> Self {
        Self::new(Status::Success, title, url, "Article processed successfully")
    }

    pub fn skipped(title: &str, url: &str) -> Self {
        Self::new(Status::Skipped, title, url, "Article already exists")
    }

    pub fn error(title: &str, url: &str, message: impl Into<String>) -> Self {
        Self::new(Status::Error, title, url, message)
    }

    /// A parsing error carrying an excerpt of the raw model output.
    pub fn parsing_error(
        title: &str,
        url: &str,
        message: impl Into<String>,
        llm_output: &str,
        extracted_data: Option<ExtractedData>,
    ) -> Self {
        Self {
            llm_output: Some(truncate_excerpt(llm_output, 500)),
            extracted_data,
            ..Self::new(Status::ParsingError, title, url, message)
        }
    }
}

/// A record in the article store. `title` is the key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredArticle {
    pub title: String,
    pub url: String,
    pub publisheddate: String,
    pub thumbnail: Option<String>,
    pub content: String,
    pub source: String,
    pub generated_title: String,
    pub summary: String,
    pub insights: String,
}
