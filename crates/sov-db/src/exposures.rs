//! Database operations for the `exposures` table.

use chrono::{DateTime, Utc};
use sov_core::{ExtractionStatus, UrlType};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `exposures` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExposureRow {
    pub id: i64,
    pub run_id: i64,
    pub block_type: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    /// 1-based rank in the flattened crawl order.
    pub position: i32,
    pub content: Option<String>,
    pub extraction_status: String,
    pub url_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for one crawled item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExposure {
    pub block_type: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub position: i32,
}

/// Bulk-inserts the exposures of a run in one transaction, returning the
/// rows ordered by position.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is committed then.
pub async fn insert_exposures(
    pool: &PgPool,
    run_id: i64,
    exposures: &[NewExposure],
) -> Result<Vec<ExposureRow>, DbError> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(exposures.len());

    for exposure in exposures {
        let row = sqlx::query_as::<_, ExposureRow>(
            "INSERT INTO exposures (run_id, block_type, title, url, description, position) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, run_id, block_type, title, url, description, position, \
                       content, extraction_status, url_type, created_at",
        )
        .bind(run_id)
        .bind(&exposure.block_type)
        .bind(&exposure.title)
        .bind(&exposure.url)
        .bind(exposure.description.as_deref())
        .bind(exposure.position)
        .fetch_one(&mut *tx)
        .await?;
        rows.push(row);
    }

    tx.commit().await?;
    rows.sort_by_key(|r| r.position);
    Ok(rows)
}

/// Records the extraction outcome for one exposure.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the exposure does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_exposure_extraction(
    pool: &PgPool,
    id: i64,
    content: Option<&str>,
    status: ExtractionStatus,
    url_type: UrlType,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE exposures \
         SET content = $1, extraction_status = $2, url_type = $3 \
         WHERE id = $4",
    )
    .bind(content)
    .bind(status.as_str())
    .bind(url_type.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Returns all exposures for a run in position order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_exposures(pool: &PgPool, run_id: i64) -> Result<Vec<ExposureRow>, DbError> {
    let rows = sqlx::query_as::<_, ExposureRow>(
        "SELECT id, run_id, block_type, title, url, description, position, \
                content, extraction_status, url_type, created_at \
         FROM exposures \
         WHERE run_id = $1 \
         ORDER BY position",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
