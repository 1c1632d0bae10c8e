//! Title-keyed article store.
//!
//! [`ArticleStore`] is the deduplication boundary of the pipeline: at most one
//! [`StoredArticle`] exists per title. Existence checks and writes are
//! separate calls with no transaction between them, so two workers racing on
//! the same title may both write; the last write wins.
//!
//! [`JsonFileStore`] keeps the whole table in memory and rewrites a single
//! JSON file on every upsert. [`recent_articles`] is the read-side query
//! used to serve records published within the last few days.

use crate::error::StoreError;
use crate::models::StoredArticle;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Keyed article persistence.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up a record by its title.
    async fn get(&self, title: &str) -> Result<Option<StoredArticle>, StoreError>;

    /// Insert or replace the record stored under `article.title`.
    async fn put(&self, article: StoredArticle) -> Result<(), StoreError>;

    /// Every stored record, in no particular order.
    async fn scan(&self) -> Result<Vec<StoredArticle>, StoreError>;
}

/// Article store persisted as one JSON object keyed by title.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<HashMap<String, StoredArticle>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(count = records.len(), "Opened article store");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArticleStore for JsonFileStore {
    async fn get(&self, title: &str) -> Result<Option<StoredArticle>, StoreError> {
        Ok(self.records.read().await.get(title).cloned())
    }

    #[instrument(level = "debug", skip_all, fields(title = %article.title))]
    async fn put(&self, article: StoredArticle) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        next.insert(article.title.clone(), article);
        let json = serde_json::to_vec_pretty(&next)?;
        // Write lock is held through the file write so snapshots land in order.
        // Memory only changes once the file does.
        fs::write(&self.path, json).await?;
        *records = next;
        debug!(count = records.len(), "Persisted article store");
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

/// Parse a stored `publisheddate`.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (treated as UTC) and RFC 3339.
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Records published within `days_back` days of `now`, newest first.
///
/// # Arguments
///
/// * `store` - Store to scan
/// * `days_back` - Size of the look-back window in days
/// * `now` - End of the window
///
/// # Returns
///
/// Every record whose `publisheddate` is at or after `now - days_back`.
/// Records whose date cannot be parsed are left out.
///
/// # Errors
///
/// [`StoreError::WindowOutOfRange`] when `now - days_back` is not a
/// representable date, or any error from [`ArticleStore::scan`].
#[instrument(level = "info", skip(store, now))]
pub async fn recent_articles(
    store: &dyn ArticleStore,
    days_back: i64,
    now: DateTime<Utc>,
) -> Result<Vec<StoredArticle>, StoreError> {
    let threshold = Duration::try_days(days_back)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(StoreError::WindowOutOfRange(days_back))?;
    let mut recent: Vec<(DateTime<Utc>, StoredArticle)> = store
        .scan()
        .await?
        .into_iter()
        .filter_map(|article| {
            let published = parse_published(&article.publisheddate)?;
            (published >= threshold).then_some((published, article))
        })
        .collect();
    recent.sort_by(|a, b| b.0.cmp(&a.0));
    info!(count = recent.len(), %threshold, "Selected recent articles");
    Ok(recent.into_iter().map(|(_, article)| article).collect())
}
