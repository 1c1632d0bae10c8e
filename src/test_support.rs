//! Test doubles shared by the processor, scheduler and store tests.

use crate::api::ModelInvoker;
use crate::error::{ModelError, StoreError};
use crate::fetcher::{ContentFetcher, FetchOutcome, FetchedPage};
use crate::models::{ArticleCandidate, Source, StoredArticle};
use crate::store::ArticleStore;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory [`ArticleStore`] that counts reads and writes.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, StoredArticle>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn with_titles(titles: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut records = store.records.lock().unwrap();
            for title in titles {
                records.insert(title.to_string(), stored(title, "2025-05-06 00:00:00"));
            }
        }
        store
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn record(&self, title: &str) -> Option<StoredArticle> {
        self.records.lock().unwrap().get(title).cloned()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn get(&self, title: &str) -> Result<Option<StoredArticle>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(title).cloned())
    }

    async fn put(&self, article: StoredArticle) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .insert(article.title.clone(), article);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

/// Store whose reads always fail.
pub struct BrokenStore;

#[async_trait]
impl ArticleStore for BrokenStore {
    async fn get(&self, _title: &str) -> Result<Option<StoredArticle>, StoreError> {
        Err(StoreError::Io(std::io::Error::other("table unavailable")))
    }

    async fn put(&self, _article: StoredArticle) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("table unavailable")))
    }

    async fn scan(&self) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(Vec::new())
    }
}

enum Script {
    Reply(String),
    Echo,
    Fail,
    Panic,
}

/// [`ModelInvoker`] with a canned behaviour and a call counter.
pub struct ScriptedModel {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self::new(Script::Reply(reply.to_string()))
    }

    /// Answer with a well-formed response whose title is derived from the input.
    pub fn echoing() -> Self {
        Self::new(Script::Echo)
    }

    pub fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub fn panicking() -> Self {
        Self::new(Script::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    async fn ask(&self, content: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Echo => Ok(tagged(
                &format!("Insights on {content}"),
                "Snippet",
                &format!("Rewritten {content}"),
            )),
            Script::Fail => Err(ModelError::EmptyCompletion("scripted")),
            Script::Panic => panic!("model exploded"),
        }
    }
}

/// [`ContentFetcher`] serving fixed outcomes per URL.
///
/// Unknown URLs get a page whose title is the URL's last path segment
/// and whose content mentions the URL.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchOutcome>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, outcome: FetchOutcome) -> Self {
        self.pages.insert(url.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _headers: &HeaderMap) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(url).cloned().unwrap_or_else(|| {
            let slug = url.rsplit('/').next().unwrap_or(url);
            FetchOutcome::Fetched(page(slug, &format!("Body of {url}")))
        })
    }
}

pub fn page(title: &str, content: &str) -> FetchedPage {
    FetchedPage {
        title: Some(title.to_string()),
        content: Some(content.to_string()),
        image_url: Some(format!("https://img.example.com/{title}.jpg")),
        published: Some("2025-05-06T08:00:00Z".to_string()),
    }
}

pub fn tagged(insights: &str, snippet: &str, title: &str) -> String {
    format!(
        "Thinking about <title> first.\n<insights>{insights}</insights>\n\
         <thumbnail_snippet>{snippet}</thumbnail_snippet>\n<title>{title}</title>"
    )
}

pub fn candidate(slug: &str) -> ArticleCandidate {
    ArticleCandidate {
        title: format!("Feed title {slug}"),
        link: format!("https://news.example.com/news/articles/{slug}"),
        pub_date: "2025-05-06 08:00:00".to_string(),
        thumbnail: None,
        source: Source::Bbc,
    }
}

pub fn stored(title: &str, publisheddate: &str) -> StoredArticle {
    StoredArticle {
        title: title.to_string(),
        url: format!("https://news.example.com/{title}"),
        publisheddate: publisheddate.to_string(),
        thumbnail: None,
        content: "content".to_string(),
        source: "BBC".to_string(),
        generated_title: title.to_string(),
        summary: "summary".to_string(),
        insights: "insights".to_string(),
    }
}
