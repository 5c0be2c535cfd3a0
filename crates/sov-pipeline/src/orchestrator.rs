//! Run state machine: crawl, persist exposures, extract and score each
//! exposure under a concurrency cap, then aggregate.
//!
//! `pending → crawling → extracting → analyzing → completed`, with any error
//! along the way caught once at the top and recorded as `failed`. A single
//! exposure's extraction or scoring failure is logged and only removes that
//! exposure's signal from the aggregates.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use sov_core::{AppConfig, RunStatus};
use sov_db::{ExposureRow, NewScore, RunRow};
use sov_scoring::{BrandScorer, Embedder};
use sov_scraper::ExtractRequest;
use tokio::sync::mpsc;

use crate::aggregate::{aggregate, ExposureSignal};
use crate::error::PipelineError;
use crate::flatten::flatten_sections;
use crate::stages::{Crawler, Extractor};
use crate::store::RunStore;

/// Upper bound on simultaneous extractions within one run.
pub const MAX_EXTRACT_CONCURRENCY: usize = 5;
const DEFAULT_EXTRACT_CONCURRENCY: usize = 3;
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Clamped to `1..=MAX_EXTRACT_CONCURRENCY` when used.
    pub extract_max_concurrent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extract_max_concurrent: DEFAULT_EXTRACT_CONCURRENCY,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            extract_max_concurrent: config.extract_max_concurrent,
        }
    }

    fn concurrency(self) -> usize {
        self.extract_max_concurrent.clamp(1, MAX_EXTRACT_CONCURRENCY)
    }
}

/// Emitted once per exposure when its extract-and-score task finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    ExposureDone { exposure_id: i64, ok: bool },
}

pub struct Orchestrator {
    store: Arc<dyn RunStore>,
    crawler: Arc<dyn Crawler>,
    extractor: Arc<dyn Extractor>,
    embedder: Option<Arc<dyn Embedder>>,
    config: OrchestratorConfig,
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RunStore>,
        crawler: Arc<dyn Crawler>,
        extractor: Arc<dyn Extractor>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            crawler,
            extractor,
            embedder: None,
            config,
        }
    }

    /// Enables semantic scoring. Without an embedder only the rule score
    /// can make a page relevant.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn RunStore> {
        Arc::clone(&self.store)
    }

    /// Drives a `pending` run to a terminal state and returns that state.
    pub async fn execute(&self, run: &RunRow) -> RunStatus {
        tracing::info!(
            run_id = run.id,
            keyword = %run.market_keyword,
            brands = run.brands.len(),
            "run started"
        );
        match self.drive(run).await {
            Ok(()) => {
                tracing::info!(run_id = run.id, "run completed");
                RunStatus::Completed
            }
            Err(e) => {
                tracing::error!(run_id = run.id, error = %e, "run failed");
                self.fail_run_best_effort(run.id, &e.to_string()).await;
                RunStatus::Failed
            }
        }
    }

    async fn fail_run_best_effort(&self, run_id: i64, message: &str) {
        if let Err(e) = self.store.fail(run_id, message).await {
            tracing::error!(run_id, error = %e, "failed to mark run as failed");
        }
    }

    async fn drive(&self, run: &RunRow) -> Result<(), PipelineError> {
        self.store
            .advance_status(run.id, RunStatus::Pending, RunStatus::Crawling)
            .await?;

        let sections = self.crawler.crawl(&run.market_keyword).await?;
        let candidates = flatten_sections(&sections);
        if candidates.is_empty() {
            tracing::info!(
                run_id = run.id,
                sections = sections.len(),
                "no qualifying exposures"
            );
            self.store.set_total(run.id, 0).await?;
            self.store.finalize(run.id, &[], &[]).await?;
            return Ok(());
        }

        let exposures = self.store.insert_exposures(run.id, &candidates).await?;
        self.store
            .set_total(run.id, to_i32(exposures.len()))
            .await?;
        self.store
            .advance_status(run.id, RunStatus::Crawling, RunStatus::Extracting)
            .await?;
        tracing::info!(run_id = run.id, exposures = exposures.len(), "exposures persisted");

        let scorer = BrandScorer::prepare(self.embedder.as_deref(), &run.brands).await?;
        self.store
            .advance_status(run.id, RunStatus::Extracting, RunStatus::Analyzing)
            .await?;

        let signals = self.analyze(run, &exposures, &scorer).await;
        let aggregates = aggregate(&run.brands, &signals);
        self.store
            .finalize(run.id, &aggregates.results, &aggregates.by_type)
            .await?;
        Ok(())
    }

    async fn analyze(
        &self,
        run: &RunRow,
        exposures: &[ExposureRow],
        scorer: &BrandScorer<'_>,
    ) -> Vec<ExposureSignal> {
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let consumer = tokio::spawn(persist_progress(
            Arc::clone(&self.store),
            run.id,
            progress_rx,
        ));

        // Boxed up front so the spawned run future stays `Send` for any lifetime.
        let tasks: Vec<BoxFuture<'_, ExposureSignal>> = exposures
            .iter()
            .map(|exposure| {
                self.exposure_task(run, exposure, scorer, progress_tx.clone())
                    .boxed()
            })
            .collect();
        let mut signals: Vec<ExposureSignal> = stream::iter(tasks)
            .buffer_unordered(self.config.concurrency())
            .collect()
            .await;

        drop(progress_tx);
        match consumer.await {
            Ok(processed) => tracing::debug!(run_id = run.id, processed, "analysis finished"),
            Err(e) => tracing::warn!(run_id = run.id, error = %e, "progress consumer panicked"),
        }

        // Restore page order; exposure ids follow insertion order.
        signals.sort_by_key(|s| s.exposure_id);
        signals
    }

    /// Processes one exposure, reports it done, and returns its signal. A
    /// failure leaves the exposure with no relevant brands.
    async fn exposure_task(
        &self,
        run: &RunRow,
        exposure: &ExposureRow,
        scorer: &BrandScorer<'_>,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> ExposureSignal {
        let outcome = self.process_exposure(run, exposure, scorer).await;
        let ok = outcome.is_ok();
        let relevant_brands = outcome.unwrap_or_else(|e| {
            tracing::warn!(
                run_id = run.id,
                exposure_id = exposure.id,
                url = %exposure.url,
                error = %e,
                "exposure processing failed"
            );
            Vec::new()
        });
        let event = ProgressEvent::ExposureDone {
            exposure_id: exposure.id,
            ok,
        };
        if progress.send(event).await.is_err() {
            tracing::debug!(run_id = run.id, "progress consumer stopped");
        }
        ExposureSignal {
            exposure_id: exposure.id,
            block_type: exposure.block_type.clone(),
            relevant_brands,
        }
    }

    /// Extracts one exposure, persists the outcome, and scores it against
    /// every brand. Returns the brands it is relevant to.
    async fn process_exposure(
        &self,
        run: &RunRow,
        exposure: &ExposureRow,
        scorer: &BrandScorer<'_>,
    ) -> Result<Vec<String>, PipelineError> {
        let request = ExtractRequest {
            url: &exposure.url,
            snippet: exposure.description.as_deref(),
            search_title: Some(exposure.title.as_str()).filter(|t| !t.trim().is_empty()),
            brands: &run.brands,
        };
        let extraction = self.extractor.extract(request).await;
        tracing::debug!(
            run_id = run.id,
            exposure_id = exposure.id,
            url_type = %extraction.url_type,
            status = %extraction.status,
            "extraction finished"
        );
        self.store
            .update_extraction(
                exposure.id,
                extraction.content.as_deref(),
                extraction.status,
                extraction.url_type,
            )
            .await?;

        let Some(content) = extraction.content.as_deref() else {
            return Ok(Vec::new());
        };

        let scores: Vec<NewScore> = scorer
            .score_content(content)
            .await?
            .into_iter()
            .map(|(brand, score)| NewScore {
                exposure_id: exposure.id,
                brand,
                rule_score: score.rule_score,
                semantic_score: score.semantic_score,
                combined_score: score.combined_score,
                is_relevant: score.is_relevant,
            })
            .collect();
        self.store.upsert_scores(&scores).await?;

        Ok(scores
            .into_iter()
            .filter(|s| s.is_relevant)
            .map(|s| s.brand)
            .collect())
    }
}

/// Single consumer of progress events; persists the running count after
/// each one and returns the final count.
async fn persist_progress(
    store: Arc<dyn RunStore>,
    run_id: i64,
    mut events: mpsc::Receiver<ProgressEvent>,
) -> i32 {
    let mut processed: i32 = 0;
    while let Some(ProgressEvent::ExposureDone { exposure_id, ok }) = events.recv().await {
        processed = processed.saturating_add(1);
        tracing::debug!(run_id, exposure_id, ok, processed, "exposure done");
        if let Err(e) = store.record_progress(run_id, processed).await {
            tracing::warn!(run_id, error = %e, "failed to record run progress");
        }
    }
    processed
}
