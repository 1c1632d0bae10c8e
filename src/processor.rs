//! Single-article processing.
//!
//! One candidate goes through fetch, duplicate check, model invocation, field
//! extraction, validation and the store write. Every failure along the way
//! becomes a [`ProcessingResult`]; nothing escapes to the caller.

use crate::api::ModelBackend;
use crate::error::PipelineError;
use crate::extract::{TagNotFound, extract_last_tag_pair};
use crate::fetcher::ContentFetcher;
use crate::models::{ArticleCandidate, ExtractedData, ProcessingResult, StoredArticle};
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Tags the model must fill, in the order they are reported.
pub const INSIGHTS_TAG: &str = "insights";
pub const SNIPPET_TAG: &str = "thumbnail_snippet";
pub const TITLE_TAG: &str = "title";

const NO_INSIGHTS: &str = "No insights available";
const SUMMARY_FALLBACK_CHARS: usize = 500;

/// Handles each worker needs, passed in explicitly at dispatch time.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub store: Arc<dyn ArticleStore>,
    pub headers: Arc<HeaderMap>,
}

/// Process one candidate end to end.
///
/// # Arguments
///
/// * `candidate` - The feed entry to process
/// * `backend` - Model backend that writes the insights view
/// * `ctx` - Fetcher, store and request headers shared by the workers
///
/// # Returns
///
/// A [`ProcessingResult`] whose status is:
/// - `skipped` when a record with the scraped title already exists (no model
///   call, no write)
/// - `parsing_error` when the model output misses or leaves empty one of the
///   three tags
/// - `error` for any other failure, carrying the candidate's feed title
/// - `success` once the record has been written
///
/// This function never fails; every error is folded into the result.
#[instrument(level = "info", skip_all, fields(url = %candidate.link, source = %candidate.source))]
pub async fn process_single_article(
    candidate: ArticleCandidate,
    backend: ModelBackend,
    ctx: WorkerContext,
) -> ProcessingResult {
    match run(&candidate, &backend, &ctx).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Article processing failed");
            ProcessingResult::error(&candidate.title, &candidate.link, e.to_string())
        }
    }
}

async fn run(
    candidate: &ArticleCandidate,
    backend: &ModelBackend,
    ctx: &WorkerContext,
) -> Result<ProcessingResult, PipelineError> {
    let url = candidate.link.as_str();

    let fetched = ctx.fetcher.fetch(url, &ctx.headers).await;
    if fetched.is_failed() {
        warn!("Fetch failed; continuing with placeholder content");
    }
    let title = fetched.title();
    let content = fetched.content();
    debug!(%title, published = %fetched.published(), chars = content.len(), "Article page resolved");

    if ctx.store.get(&title).await?.is_some() {
        debug!(%title, "Title already stored");
        return Ok(ProcessingResult::skipped(&title, url));
    }

    let llm_output = backend.invoke(&content).await?;

    let insights = extract_last_tag_pair(&llm_output, INSIGHTS_TAG);
    let summary = extract_last_tag_pair(&llm_output, SNIPPET_TAG);
    let gen_title = extract_last_tag_pair(&llm_output, TITLE_TAG);

    let extracted = ExtractedData {
        insights: insights.as_deref().unwrap_or_default().to_string(),
        summary: summary.as_deref().unwrap_or_default().to_string(),
        gen_title: gen_title.as_deref().unwrap_or_default().to_string(),
    };

    let errors: Vec<&TagNotFound> = [&insights, &summary, &gen_title]
        .into_iter()
        .filter_map(|r| r.as_ref().err())
        .collect();
    if !errors.is_empty() {
        let failures = errors.iter().join(" ");
        warn!(
            tags = %errors.iter().map(|e| e.tag()).join(","),
            output = %truncate_for_log(&llm_output, 200),
            "Model output is missing tags"
        );
        return Ok(ProcessingResult::parsing_error(
            &title,
            url,
            format!("Error extracting fields from LLM response: {failures}"),
            &llm_output,
            Some(extracted),
        ));
    }

    let missing = [
        (INSIGHTS_TAG, &extracted.insights),
        (SNIPPET_TAG, &extracted.summary),
        (TITLE_TAG, &extracted.gen_title),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(tag, _)| tag)
    .join(", ");
    if !missing.is_empty() {
        warn!(%missing, "Model output has empty fields");
        return Ok(ProcessingResult::parsing_error(
            &title,
            url,
            format!("Missing or empty fields: {missing}"),
            &llm_output,
            Some(extracted),
        ));
    }

    let record = build_record(candidate, &title, &content, fetched.image_url(), extracted);
    ctx.store.put(record).await?;

    Ok(ProcessingResult::success(&title, url))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Assemble the stored record, filling empty generated fields from the
/// scraped data.
fn build_record(
    candidate: &ArticleCandidate,
    title: &str,
    content: &str,
    image_url: Option<&str>,
    extracted: ExtractedData,
) -> StoredArticle {
    StoredArticle {
        title: title.to_string(),
        url: candidate.link.clone(),
        publisheddate: candidate.pub_date.clone(),
        thumbnail: candidate
            .thumbnail
            .clone()
            .or_else(|| image_url.map(str::to_string)),
        content: content.to_string(),
        source: candidate.source.tag().to_string(),
        generated_title: non_empty(extracted.gen_title).unwrap_or_else(|| title.to_string()),
        summary: non_empty(extracted.summary).unwrap_or_else(|| {
            let head: String = content.chars().take(SUMMARY_FALLBACK_CHARS).collect();
            format!("{head}...")
        }),
        insights: non_empty(extracted.insights).unwrap_or_else(|| NO_INSIGHTS.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchOutcome;
    use crate::models::{Source, Status};
    use crate::test_support::{
        BrokenStore, MemoryStore, ScriptedModel, StaticFetcher, candidate, page, tagged,
    };

    const URL: &str = "https://news.example.com/news/articles/budget";

    struct Harness {
        model: Arc<ScriptedModel>,
        store: Arc<MemoryStore>,
        fetcher: Arc<StaticFetcher>,
    }

    impl Harness {
        fn new(model: ScriptedModel, store: MemoryStore) -> Self {
            let fetcher = StaticFetcher::default().with(
                URL,
                FetchOutcome::Fetched(page("Budget passes", "The chamber approved the budget.")),
            );
            Self {
                model: Arc::new(model),
                store: Arc::new(store),
                fetcher: Arc::new(fetcher),
            }
        }

        async fn run(&self) -> ProcessingResult {
            let ctx = WorkerContext {
                fetcher: self.fetcher.clone(),
                store: self.store.clone(),
                headers: Arc::new(HeaderMap::new()),
            };
            let backend = ModelBackend::OpenAi(self.model.clone());
            process_single_article(candidate("budget"), backend, ctx).await
        }
    }

    #[tokio::test]
    async fn test_success_writes_record() {
        let h = Harness::new(
            ScriptedModel::replying(&tagged("Neutral view", "Short line", "Budget approved")),
            MemoryStore::default(),
        );
        let result = h.run().await;

        assert_eq!(result.status, Status::Success);
        assert_eq!(result.title, "Budget passes");
        assert_eq!(result.url, URL);
        assert_eq!(result.message, "Article processed successfully");

        let record = h.store.record("Budget passes").unwrap();
        assert_eq!(record.generated_title, "Budget approved");
        assert_eq!(record.summary, "Short line");
        assert_eq!(record.insights, "Neutral view");
        assert_eq!(record.source, "BBC");
        assert_eq!(record.publisheddate, "2025-05-06 08:00:00");
        assert_eq!(record.content, "The chamber approved the budget.");
        assert_eq!(
            record.thumbnail.as_deref(),
            Some("https://img.example.com/Budget passes.jpg")
        );
        assert_eq!(h.store.puts(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_title_skips_model_and_write() {
        let h = Harness::new(
            ScriptedModel::echoing(),
            MemoryStore::with_titles(&["Budget passes"]),
        );
        let result = h.run().await;

        assert_eq!(result.status, Status::Skipped);
        assert_eq!(result.message, "Article already exists");
        assert_eq!(h.model.calls(), 0);
        assert_eq!(h.store.puts(), 0);
        assert_eq!(h.store.gets(), 1);
    }

    #[tokio::test]
    async fn test_missing_title_tag_is_parsing_error() {
        let h = Harness::new(
            ScriptedModel::replying(
                "<insights>Neutral view</insights><thumbnail_snippet>Short line</thumbnail_snippet>",
            ),
            MemoryStore::default(),
        );
        let result = h.run().await;

        assert_eq!(result.status, Status::ParsingError);
        assert!(result.message.starts_with("Error extracting fields from LLM response"));
        assert!(result.message.contains("</title>"));
        let data = result.extracted_data.unwrap();
        assert_eq!(data.insights, "Neutral view");
        assert_eq!(data.summary, "Short line");
        assert_eq!(data.gen_title, "");
        assert_eq!(h.store.puts(), 0);
    }

    #[tokio::test]
    async fn test_all_empty_tags_fail_validation() {
        let h = Harness::new(
            ScriptedModel::replying(&tagged("", "  ", "")),
            MemoryStore::default(),
        );
        let result = h.run().await;

        assert_eq!(result.status, Status::ParsingError);
        assert_eq!(
            result.message,
            "Missing or empty fields: insights, thumbnail_snippet, title"
        );
        assert_eq!(result.extracted_data, Some(ExtractedData::default()));
        assert!(result.llm_output.is_some());
        assert_eq!(h.store.puts(), 0);
    }

    #[tokio::test]
    async fn test_one_empty_tag_names_only_that_field() {
        let h = Harness::new(
            ScriptedModel::replying(&tagged("Neutral view", "", "Budget approved")),
            MemoryStore::default(),
        );
        let result = h.run().await;

        assert_eq!(result.message, "Missing or empty fields: thumbnail_snippet");
        let data = result.extracted_data.unwrap();
        assert_eq!(data.gen_title, "Budget approved");
    }

    #[tokio::test]
    async fn test_untagged_output_excerpt_is_truncated() {
        let h = Harness::new(
            ScriptedModel::replying(&"z".repeat(600)),
            MemoryStore::default(),
        );
        let result = h.run().await;

        assert_eq!(result.status, Status::ParsingError);
        let excerpt = result.llm_output.unwrap();
        assert_eq!(excerpt.len(), 503);
        assert!(excerpt.ends_with("..."));
    }

    #[tokio::test]
    async fn test_model_failure_is_error_with_feed_title() {
        let h = Harness::new(ScriptedModel::failing(), MemoryStore::default());
        let result = h.run().await;

        assert_eq!(result.status, Status::Error);
        assert_eq!(result.title, "Feed title budget");
        assert_eq!(result.url, URL);
        assert_eq!(result.message, "scripted returned no completion text");
    }

    #[tokio::test]
    async fn test_store_failure_is_error() {
        let ctx = WorkerContext {
            fetcher: Arc::new(StaticFetcher::default()),
            store: Arc::new(BrokenStore),
            headers: Arc::new(HeaderMap::new()),
        };
        let model = Arc::new(ScriptedModel::echoing());
        let result =
            process_single_article(candidate("x"), ModelBackend::Gemini(model.clone()), ctx).await;

        assert_eq!(result.status, Status::Error);
        assert!(result.message.contains("table unavailable"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_still_reaches_model() {
        let fetcher = StaticFetcher::default().with(
            URL,
            FetchOutcome::Failed {
                reason: "connection reset".to_string(),
            },
        );
        let store = Arc::new(MemoryStore::default());
        let model = Arc::new(ScriptedModel::echoing());
        let ctx = WorkerContext {
            fetcher: Arc::new(fetcher),
            store: store.clone(),
            headers: Arc::new(HeaderMap::new()),
        };
        let result =
            process_single_article(candidate("budget"), ModelBackend::OpenAi(model.clone()), ctx)
                .await;

        assert_eq!(result.status, Status::Success);
        assert_eq!(result.title, "Error extracting title");
        assert_eq!(model.calls(), 1);
        let record = store.record("Error extracting title").unwrap();
        assert_eq!(record.content, "Error fetching content: connection reset");
        assert!(record.thumbnail.is_none());
    }

    #[test]
    fn test_build_record_fallbacks() {
        let mut c = candidate("x");
        c.thumbnail = Some("https://feed.example.com/thumb.jpg".to_string());
        c.source = Source::AlJazeera;
        let content = "w".repeat(700);

        let record = build_record(
            &c,
            "Scraped title",
            &content,
            Some("https://img.example.com/page.jpg"),
            ExtractedData::default(),
        );

        assert_eq!(record.generated_title, "Scraped title");
        assert_eq!(record.summary, format!("{}...", "w".repeat(500)));
        assert_eq!(record.insights, "No insights available");
        assert_eq!(record.source, "AJ");
        assert_eq!(
            record.thumbnail.as_deref(),
            Some("https://feed.example.com/thumb.jpg")
        );
    }
}
