//! # Unbiased Updates
//!
//! Turns news articles into neutral "insights views" with an LLM and keeps
//! them in a title-keyed store for a read API to serve.
//!
//! ## Usage
//!
//! ```sh
//! unbiased_updates -i candidates.json --model openai
//! unbiased_updates --recent-days 7
//! ```
//!
//! ## Architecture
//!
//! 1. **Candidates**: a JSON list of feed/sitemap entries, one per article
//! 2. **Processing**: per source, candidates run through
//!    [`scheduler::process_articles_parallel`] in batches; each article is
//!    fetched, checked against the store, rewritten by the model, parsed and
//!    written ([`processor::process_single_article`])
//! 3. **Reporting**: a [`report::RunSummary`] per source, plus an optional
//!    JSON dump of every result
//!
//! The same store answers `--recent-days` queries.

use chrono::Utc;
use clap::Parser;
use itertools::Itertools;
use reqwest::Client;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod extract;
mod fetcher;
mod models;
mod processor;
mod prompts;
mod report;
mod scheduler;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use api::{Backends, GeminiChat, ModelInvoker, OpenAiChat};
use cli::Cli;
use config::AppConfig;
use fetcher::HtmlFetcher;
use models::ArticleCandidate;
use processor::WorkerContext;
use report::RunSummary;
use store::{JsonFileStore, recent_articles};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("unbiased_updates starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, candidates = ?args.candidates, model = %args.model, "Parsed CLI arguments");

    let config = AppConfig::load(args.config.as_deref()).await?;

    let store_dir = match config.store_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    ensure_writable_dir(store_dir).await?;
    let store = Arc::new(JsonFileStore::open(&config.store_path).await?);

    // ---- Read side ----
    if let Some(days) = args.recent_days {
        let articles = recent_articles(store.as_ref(), days, Utc::now()).await?;
        info!(store = %store.path().display(), days, count = articles.len(), "Serving recent articles");
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    // ---- Backends ----
    let http = Client::builder().build()?;
    let backends = build_backends(&args, &config, &http);
    debug!(?backends, "Configured model backends");
    // Surface a missing key before any candidate is read.
    backends.resolve(args.model)?;

    // ---- Candidates ----
    let Some(candidates_path) = args.candidates.as_deref() else {
        return Err("--candidates is required".into());
    };
    let candidates = load_candidates(candidates_path).await?;

    let fetcher = Arc::new(HtmlFetcher::new(
        http.clone(),
        Duration::from_secs(config.request_timeout_secs),
    ));
    let options = config.batch_options();

    // ---- Process per source ----
    let mut all_results = Vec::with_capacity(candidates.len());
    let by_source = candidates
        .into_iter()
        .into_group_map_by(|c| c.source)
        .into_iter()
        .sorted_by_key(|(source, _)| *source);

    for (source, batch) in by_source {
        info!(%source, count = batch.len(), "Processing source");
        let ctx = WorkerContext {
            fetcher: fetcher.clone(),
            store: store.clone(),
            headers: Arc::new(config.headers_for(source)?),
        };

        let results =
            scheduler::process_articles_parallel(batch, args.model, &backends, ctx, &options)
                .await?;

        let summary = RunSummary::from_results(&results);
        info!(
            %source,
            total = summary.total,
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            parsing_errors = summary.parsing_errors,
            "Source complete"
        );
        println!("\n[{source}]\n{summary}");
        all_results.extend(results);
    }

    if let Some(path) = &args.results_json {
        tokio::fs::write(path, serde_json::to_vec_pretty(&all_results)?).await?;
        info!(path = %path.display(), count = all_results.len(), "Wrote results JSON");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Bind an invoker for every backend that has an API key.
fn build_backends(args: &Cli, config: &AppConfig, http: &Client) -> Backends {
    let openai = args.openai_api_key.as_ref().map(|key| {
        Arc::new(OpenAiChat::new(
            http.clone(),
            &config.openai.api_base,
            key,
            &config.openai.model,
        )) as Arc<dyn ModelInvoker>
    });
    let gemini = args.google_api_key.as_ref().map(|key| {
        Arc::new(GeminiChat::new(
            http.clone(),
            &config.gemini.api_base,
            key,
            &config.gemini.model,
        )) as Arc<dyn ModelInvoker>
    });
    Backends { openai, gemini }
}

#[instrument(level = "info")]
async fn load_candidates(path: &Path) -> Result<Vec<ArticleCandidate>, Box<dyn Error>> {
    let raw = tokio::fs::read(path).await?;
    let candidates: Vec<ArticleCandidate> = serde_json::from_slice(&raw)?;
    info!(count = candidates.len(), "Loaded article candidates");
    Ok(candidates)
}
