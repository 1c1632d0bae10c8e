//! Batched, bounded-concurrency dispatch of article processing.
//!
//! Candidates are split into consecutive fixed-size batches that run one
//! after another. Inside a batch every candidate is processed on its own
//! tokio task, at most `min(max_workers, batch len)` at a time, and results
//! are collected in completion order. A fixed delay separates batches; it is
//! the only pacing applied to the upstream sites and model APIs.

use crate::api::{Backends, ModelSelector};
use crate::error::PipelineError;
use crate::models::{ArticleCandidate, ProcessingResult, Status};
use crate::processor::{WorkerContext, process_single_article};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Knobs for [`process_articles_parallel`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub max_workers: usize,
    pub delay_between_batches: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_workers: 5,
            delay_between_batches: Duration::from_secs(2),
        }
    }
}

impl BatchOptions {
    fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidOptions(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(PipelineError::InvalidOptions(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sizes of the batches `total` candidates are split into.
///
/// ```ignore
/// assert_eq!(batch_sizes(5, 2), vec![2, 2, 1]);
/// ```
pub fn batch_sizes(total: usize, batch_size: usize) -> Vec<usize> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| batch_size.min(total - start))
        .collect()
}

fn log_result(result: &ProcessingResult) {
    match result.status {
        Status::Success => info!(title = %result.title, "Article stored"),
        Status::Skipped => info!(title = %result.title, "Skipped: already exists"),
        Status::ParsingError => {
            warn!(title = %result.title, message = %result.message, "Parsing error")
        }
        Status::Error => error!(title = %result.title, message = %result.message, "Error"),
    }
}

/// Process `candidates` in sequential batches with bounded parallelism.
///
/// # Arguments
///
/// * `candidates` - Articles to process, split into batches in this order
/// * `selector` - Model family every article in the run is sent to
/// * `backends` - Available invokers; `selector` must have one
/// * `ctx` - Shared worker handles, cloned into each task
/// * `options` - Batch size, worker cap and inter-batch delay
///
/// # Returns
///
/// One [`ProcessingResult`] per candidate: batches in order, each batch in
/// completion order. Failures inside an article never abort the run; a
/// worker task that dies (panics) yields a synthetic `error` result.
///
/// # Errors
///
/// Returns an error before any work is started if:
/// - The selected model has no backend in `backends`
///   ([`PipelineError::MissingBackend`])
/// - `batch_size` or `max_workers` is zero ([`PipelineError::InvalidOptions`])
#[instrument(level = "info", skip_all, fields(model = %selector, total = candidates.len()))]
pub async fn process_articles_parallel(
    candidates: Vec<ArticleCandidate>,
    selector: ModelSelector,
    backends: &Backends,
    ctx: WorkerContext,
    options: &BatchOptions,
) -> Result<Vec<ProcessingResult>, PipelineError> {
    let backend = backends.resolve(selector)?;
    options.validate()?;

    let sizes = batch_sizes(candidates.len(), options.batch_size);
    let batch_count = sizes.len();
    info!(
        total = candidates.len(),
        batches = batch_count,
        batch_size = options.batch_size,
        ?sizes,
        "Processing articles"
    );

    let mut all_results = Vec::with_capacity(candidates.len());

    for (batch_idx, batch) in candidates.chunks(options.batch_size).enumerate() {
        let batch_no = batch_idx + 1;
        let workers = options.max_workers.min(batch.len());
        info!(batch = batch_no, of = batch_count, size = batch.len(), workers, "Starting batch");

        let batch_results: Vec<ProcessingResult> = stream::iter(batch.iter().cloned())
            .map(|candidate| {
                let handle = tokio::spawn(process_single_article(
                    candidate.clone(),
                    backend.clone(),
                    ctx.clone(),
                ));
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(url = %candidate.link, error = %e, "Worker task failed");
                            ProcessingResult::error(
                                &candidate.title,
                                &candidate.link,
                                format!("Worker execution error: {e}"),
                            )
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .inspect(log_result)
            .collect()
            .await;

        let count = |status: Status| batch_results.iter().filter(|r| r.status == status).count();
        info!(
            batch = batch_no,
            success = count(Status::Success),
            skipped = count(Status::Skipped),
            parsing_errors = count(Status::ParsingError),
            errors = count(Status::Error),
            "Batch complete"
        );
        all_results.extend(batch_results);

        if batch_no < batch_count {
            info!(delay = ?options.delay_between_batches, "Waiting before next batch");
            sleep(options.delay_between_batches).await;
        }
    }

    Ok(all_results)
}
