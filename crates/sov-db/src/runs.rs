//! Database operations for the `runs` table.

use chrono::{DateTime, Utc};
use sov_core::RunStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, user_id, market_keyword, brands, status, \
                           total_exposures, processed_exposures, error_message, \
                           created_at, completed_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: String,
    pub market_keyword: String,
    /// Ordered brand names; fixed at creation.
    pub brands: Vec<String>,
    pub status: String,
    pub total_exposures: i32,
    pub processed_exposures: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRow {
    /// Parses the stored status column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if the column holds an unknown value.
    pub fn run_status(&self) -> Result<RunStatus, DbError> {
        self.status
            .parse::<RunStatus>()
            .map_err(|e| DbError::InvalidData(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creates a new run in `pending` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_run(
    pool: &PgPool,
    user_id: &str,
    market_keyword: &str,
    brands: &[String],
) -> Result<RunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, RunRow>(&format!(
        "INSERT INTO runs (public_id, user_id, market_keyword, brands, status) \
         VALUES ($1, $2, $3, $4, 'pending') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(user_id)
    .bind(market_keyword)
    .bind(brands)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Moves a run from `from` to `to`, guarded on the current status.
///
/// Only forward transitions allowed by [`RunStatus::can_transition_to`] are
/// attempted. Terminal targets stamp `completed_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the transition is not allowed
/// or the row is no longer in `from`, or [`DbError::Sqlx`] if the update fails.
pub async fn advance_run_status(
    pool: &PgPool,
    id: i64,
    from: RunStatus,
    to: RunStatus,
) -> Result<(), DbError> {
    if !from.can_transition_to(to) {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: from.as_str(),
            target: to.as_str(),
        });
    }

    let result = sqlx::query(
        "UPDATE runs \
         SET status = $1, \
             completed_at = CASE WHEN $1 IN ('completed', 'failed') THEN NOW() ELSE completed_at END \
         WHERE id = $2 AND status = $3",
    )
    .bind(to.as_str())
    .bind(id)
    .bind(from.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: from.as_str(),
            target: to.as_str(),
        });
    }

    Ok(())
}

/// Records the number of exposures persisted for a run.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_run_total(pool: &PgPool, id: i64, total_exposures: i32) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE runs SET total_exposures = $1 WHERE id = $2")
        .bind(total_exposures)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Persists the processed-exposure counter. The stored value never decreases.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_run_progress(
    pool: &PgPool,
    id: i64,
    processed_exposures: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE runs \
         SET processed_exposures = GREATEST(processed_exposures, LEAST($1, total_exposures)) \
         WHERE id = $2",
    )
    .bind(processed_exposures)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Marks a non-terminal run as `failed` with an error message.
///
/// Result rows are removed in the same transaction so a failed run never
/// exposes partial aggregates.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is already terminal,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status NOT IN ('completed', 'failed')",
    )
    .bind(error_message)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "non-terminal",
            target: "failed",
        });
    }

    sqlx::query("DELETE FROM results WHERE run_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM results_by_type WHERE run_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if the
/// query fails.
pub async fn get_run(pool: &PgPool, id: i64) -> Result<RunRow, DbError> {
    sqlx::query_as::<_, RunRow>(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Fetches a single run by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if the
/// query fails.
pub async fn get_run_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<RunRow, DbError> {
    sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, optionally for one user, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_runs(
    pool: &PgPool,
    user_id: Option<&str>,
    limit: i64,
) -> Result<Vec<RunRow>, DbError> {
    let rows = match user_id {
        Some(user_id) => {
            sqlx::query_as::<_, RunRow>(&format!(
                "SELECT {RUN_COLUMNS} FROM runs \
                 WHERE user_id = $1 \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $2"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, RunRow>(&format!(
                "SELECT {RUN_COLUMNS} FROM runs \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
