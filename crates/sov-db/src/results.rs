//! Database operations for the `results` and `results_by_type` tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultRow {
    pub id: i64,
    pub run_id: i64,
    pub brand: String,
    pub exposure_count: i32,
    pub sov_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A row from the `results_by_type` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultByTypeRow {
    pub id: i64,
    pub run_id: i64,
    pub block_type: String,
    pub brand: String,
    pub exposure_count: i32,
    pub total_in_type: i32,
    pub percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResult {
    pub brand: String,
    pub exposure_count: i32,
    pub sov_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResultByType {
    pub block_type: String,
    pub brand: String,
    pub exposure_count: i32,
    pub total_in_type: i32,
    pub percentage: Decimal,
}

/// Writes the aggregates for a run and marks it `completed`, atomically.
///
/// Existing aggregate rows for the run are replaced. The status update is
/// guarded on the run being in `crawling` or `analyzing`; if the guard fails
/// nothing is written.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not in a state that
/// may complete, or [`DbError::Sqlx`] if any statement fails.
pub async fn finalize_run_results(
    pool: &PgPool,
    run_id: i64,
    results: &[NewResult],
    by_type: &[NewResultByType],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM results WHERE run_id = $1")
        .bind(run_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM results_by_type WHERE run_id = $1")
        .bind(run_id)
        .execute(&mut *tx)
        .await?;

    for result in results {
        sqlx::query(
            "INSERT INTO results (run_id, brand, exposure_count, sov_percentage) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(run_id)
        .bind(&result.brand)
        .bind(result.exposure_count)
        .bind(result.sov_percentage)
        .execute(&mut *tx)
        .await?;
    }

    for row in by_type {
        sqlx::query(
            "INSERT INTO results_by_type \
                 (run_id, block_type, brand, exposure_count, total_in_type, percentage) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(run_id)
        .bind(&row.block_type)
        .bind(&row.brand)
        .bind(row.exposure_count)
        .bind(row.total_in_type)
        .bind(row.percentage)
        .execute(&mut *tx)
        .await?;
    }

    let updated = sqlx::query(
        "UPDATE runs \
         SET status = 'completed', completed_at = NOW(), \
             processed_exposures = total_exposures \
         WHERE id = $1 AND status IN ('crawling', 'analyzing')",
    )
    .bind(run_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::InvalidRunTransition {
            id: run_id,
            expected_status: "crawling or analyzing",
            target: "completed",
        });
    }

    tx.commit().await?;
    Ok(())
}

/// Returns the per-brand results of a run ordered by share of voice.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_results(pool: &PgPool, run_id: i64) -> Result<Vec<ResultRow>, DbError> {
    let rows = sqlx::query_as::<_, ResultRow>(
        "SELECT id, run_id, brand, exposure_count, sov_percentage, created_at \
         FROM results \
         WHERE run_id = $1 \
         ORDER BY sov_percentage DESC, brand",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the per-block-type results of a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_results_by_type(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<ResultByTypeRow>, DbError> {
    let rows = sqlx::query_as::<_, ResultByTypeRow>(
        "SELECT id, run_id, block_type, brand, exposure_count, total_in_type, percentage, \
                created_at \
         FROM results_by_type \
         WHERE run_id = $1 \
         ORDER BY block_type, percentage DESC, brand",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
