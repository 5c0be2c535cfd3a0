//! Persistence seam used by the orchestrator and the run service.

use async_trait::async_trait;
use sov_core::{ExtractionStatus, RunStatus, UrlType};
use sov_db::{
    DbError, ExposureRow, NewExposure, NewResult, NewResultByType, NewScore, ResultByTypeRow,
    ResultRow, RunRow, ScoreRow,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Everything a run reads and writes, keyed by the run's internal id.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(
        &self,
        user_id: &str,
        market_keyword: &str,
        brands: &[String],
    ) -> Result<RunRow, DbError>;

    async fn get_run(&self, public_id: Uuid) -> Result<RunRow, DbError>;

    async fn advance_status(&self, run_id: i64, from: RunStatus, to: RunStatus)
        -> Result<(), DbError>;

    async fn set_total(&self, run_id: i64, total_exposures: i32) -> Result<(), DbError>;

    /// Never lowers the stored counter.
    async fn record_progress(&self, run_id: i64, processed_exposures: i32)
        -> Result<(), DbError>;

    async fn insert_exposures(
        &self,
        run_id: i64,
        exposures: &[NewExposure],
    ) -> Result<Vec<ExposureRow>, DbError>;

    async fn update_extraction(
        &self,
        exposure_id: i64,
        content: Option<&str>,
        status: ExtractionStatus,
        url_type: UrlType,
    ) -> Result<(), DbError>;

    /// Writes every score of one exposure atomically: all or none.
    async fn upsert_scores(&self, scores: &[NewScore]) -> Result<(), DbError>;

    /// Writes aggregates and marks the run `completed` in one step.
    async fn finalize(
        &self,
        run_id: i64,
        results: &[NewResult],
        by_type: &[NewResultByType],
    ) -> Result<(), DbError>;

    /// Marks the run `failed` and drops any aggregates.
    async fn fail(&self, run_id: i64, error_message: &str) -> Result<(), DbError>;

    async fn list_exposures(&self, run_id: i64) -> Result<Vec<ExposureRow>, DbError>;

    async fn list_scores(&self, run_id: i64) -> Result<Vec<ScoreRow>, DbError>;

    async fn list_results(&self, run_id: i64) -> Result<Vec<ResultRow>, DbError>;

    async fn list_results_by_type(&self, run_id: i64) -> Result<Vec<ResultByTypeRow>, DbError>;
}

/// [`RunStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_run(
        &self,
        user_id: &str,
        market_keyword: &str,
        brands: &[String],
    ) -> Result<RunRow, DbError> {
        sov_db::create_run(&self.pool, user_id, market_keyword, brands).await
    }

    async fn get_run(&self, public_id: Uuid) -> Result<RunRow, DbError> {
        sov_db::get_run_by_public_id(&self.pool, public_id).await
    }

    async fn advance_status(
        &self,
        run_id: i64,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<(), DbError> {
        sov_db::advance_run_status(&self.pool, run_id, from, to).await
    }

    async fn set_total(&self, run_id: i64, total_exposures: i32) -> Result<(), DbError> {
        sov_db::set_run_total(&self.pool, run_id, total_exposures).await
    }

    async fn record_progress(
        &self,
        run_id: i64,
        processed_exposures: i32,
    ) -> Result<(), DbError> {
        sov_db::record_run_progress(&self.pool, run_id, processed_exposures).await
    }

    async fn insert_exposures(
        &self,
        run_id: i64,
        exposures: &[NewExposure],
    ) -> Result<Vec<ExposureRow>, DbError> {
        sov_db::insert_exposures(&self.pool, run_id, exposures).await
    }

    async fn update_extraction(
        &self,
        exposure_id: i64,
        content: Option<&str>,
        status: ExtractionStatus,
        url_type: UrlType,
    ) -> Result<(), DbError> {
        sov_db::update_exposure_extraction(&self.pool, exposure_id, content, status, url_type)
            .await
    }

    async fn upsert_scores(&self, scores: &[NewScore]) -> Result<(), DbError> {
        sov_db::upsert_scores(&self.pool, scores).await.map(|_| ())
    }

    async fn finalize(
        &self,
        run_id: i64,
        results: &[NewResult],
        by_type: &[NewResultByType],
    ) -> Result<(), DbError> {
        sov_db::finalize_run_results(&self.pool, run_id, results, by_type).await
    }

    async fn fail(&self, run_id: i64, error_message: &str) -> Result<(), DbError> {
        sov_db::fail_run(&self.pool, run_id, error_message).await
    }

    async fn list_exposures(&self, run_id: i64) -> Result<Vec<ExposureRow>, DbError> {
        sov_db::list_exposures(&self.pool, run_id).await
    }

    async fn list_scores(&self, run_id: i64) -> Result<Vec<ScoreRow>, DbError> {
        sov_db::list_scores_for_run(&self.pool, run_id).await
    }

    async fn list_results(&self, run_id: i64) -> Result<Vec<ResultRow>, DbError> {
        sov_db::list_results(&self.pool, run_id).await
    }

    async fn list_results_by_type(&self, run_id: i64) -> Result<Vec<ResultByTypeRow>, DbError> {
        sov_db::list_results_by_type(&self.pool, run_id).await
    }
}
