use sov_core::{CoreError, RunStatus};
use sov_db::DbError;
use sov_scoring::ScoringError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid run request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error("crawl failed: {0}")]
    Crawl(String),

    #[error("run is still {status}; results are available once it completes or fails")]
    NotTerminal { status: RunStatus },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
