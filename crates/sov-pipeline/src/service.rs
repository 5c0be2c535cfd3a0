//! Job submission and polling for analysis runs.

use std::sync::Arc;

use sov_core::{normalize_brands, normalize_keyword, RunStatus};
use sov_db::{ExposureRow, ResultByTypeRow, ResultRow, RunRow};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::aggregate::{recompute_results, Aggregates};
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use crate::store::RunStore;

/// A run that has been accepted and is executing in the background.
#[derive(Debug)]
pub struct SubmittedRun {
    pub run_id: Uuid,
    /// Resolves to the terminal status once the run finishes.
    pub task: JoinHandle<RunStatus>,
}

/// Point-in-time view of a run for pollers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunProgress {
    pub status: RunStatus,
    pub total_exposures: i32,
    pub processed_exposures: i32,
    pub error_message: Option<String>,
}

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunRow,
    pub results: Vec<ResultRow>,
    pub by_type: Vec<ResultByTypeRow>,
    pub exposures: Vec<ExposureRow>,
}

/// Read-only access to stored runs. Needs no crawler, extractor or browser.
#[derive(Clone)]
pub struct RunReader {
    store: Arc<dyn RunStore>,
}

pub struct RunService {
    store: Arc<dyn RunStore>,
    reader: RunReader,
    orchestrator: Arc<Orchestrator>,
}

impl RunService {
    #[must_use]
    pub fn new(orchestrator: Orchestrator) -> Self {
        let store = orchestrator.store();
        Self {
            reader: RunReader::new(Arc::clone(&store)),
            store,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Validates the request, stores a `pending` run, and starts it on the
    /// Tokio runtime. Returns as soon as the run is stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for a blank keyword or a
    /// brand list outside 1..=10 after cleaning, or [`PipelineError::Db`] if
    /// the run cannot be stored.
    pub async fn create_run<S: AsRef<str>>(
        &self,
        user_id: &str,
        market_keyword: &str,
        brands: &[S],
    ) -> Result<SubmittedRun, PipelineError> {
        let keyword = normalize_keyword(market_keyword)?;
        let brands = normalize_brands(brands)?;

        let run = self.store.create_run(user_id, &keyword, &brands).await?;
        let run_id = run.public_id;
        tracing::info!(run_id = run.id, public_id = %run_id, keyword = %keyword, "run submitted");

        let orchestrator = Arc::clone(&self.orchestrator);
        let task = tokio::spawn(async move { orchestrator.execute(&run).await });
        Ok(SubmittedRun { run_id, task })
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if the run does not exist or cannot be read.
    pub async fn get_run_status(&self, run_id: Uuid) -> Result<RunProgress, PipelineError> {
        self.reader.get_run_status(run_id).await
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::NotTerminal`] while the run is still
    /// executing, or [`PipelineError::Db`] on lookup failures.
    pub async fn get_run_result(&self, run_id: Uuid) -> Result<RunReport, PipelineError> {
        self.reader.get_run_result(run_id).await
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] on lookup failures.
    pub async fn recompute_results(&self, run_id: Uuid) -> Result<Aggregates, PipelineError> {
        self.reader.recompute_results(run_id).await
    }
}

impl RunReader {
    #[must_use]
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] if the run does not exist or cannot be read.
    pub async fn get_run_status(&self, run_id: Uuid) -> Result<RunProgress, PipelineError> {
        let run = self.store.get_run(run_id).await?;
        Ok(RunProgress {
            status: run.run_status()?,
            total_exposures: run.total_exposures,
            processed_exposures: run.processed_exposures,
            error_message: run.error_message,
        })
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::NotTerminal`] while the run is still
    /// executing, or [`PipelineError::Db`] on lookup failures.
    pub async fn get_run_result(&self, run_id: Uuid) -> Result<RunReport, PipelineError> {
        let run = self.store.get_run(run_id).await?;
        let status = run.run_status()?;
        if !status.is_terminal() {
            return Err(PipelineError::NotTerminal { status });
        }

        let results = self.store.list_results(run.id).await?;
        let by_type = self.store.list_results_by_type(run.id).await?;
        let exposures = self.store.list_exposures(run.id).await?;
        Ok(RunReport {
            run,
            results,
            by_type,
            exposures,
        })
    }

    /// Recomputes a run's aggregates from its stored exposures and scores
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] on lookup failures.
    pub async fn recompute_results(&self, run_id: Uuid) -> Result<Aggregates, PipelineError> {
        let run = self.store.get_run(run_id).await?;
        let exposures = self.store.list_exposures(run.id).await?;
        let scores = self.store.list_scores(run.id).await?;
        Ok(recompute_results(&run.brands, &exposures, &scores))
    }
}
