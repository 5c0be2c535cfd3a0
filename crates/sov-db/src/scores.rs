//! Database operations for the `scores` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub id: i64,
    pub exposure_id: i64,
    pub brand: String,
    pub rule_score: Decimal,
    pub semantic_score: Decimal,
    pub combined_score: Decimal,
    pub is_relevant: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for one (exposure, brand) judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub exposure_id: i64,
    pub brand: String,
    pub rule_score: f64,
    pub semantic_score: f64,
    pub combined_score: f64,
    pub is_relevant: bool,
}

/// Rounds a raw score to the 4 decimal places stored in `NUMERIC(6,4)`.
///
/// Non-finite inputs are stored as zero.
#[must_use]
pub fn score_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(4))
        .unwrap_or(Decimal::ZERO)
}

const UPSERT_SCORE: &str = "INSERT INTO scores \
         (exposure_id, brand, rule_score, semantic_score, combined_score, is_relevant) \
     VALUES ($1, $2, $3, $4, $5, $6) \
     ON CONFLICT (exposure_id, brand) DO UPDATE SET \
         rule_score = EXCLUDED.rule_score, \
         semantic_score = EXCLUDED.semantic_score, \
         combined_score = EXCLUDED.combined_score, \
         is_relevant = EXCLUDED.is_relevant \
     RETURNING id, exposure_id, brand, rule_score, semantic_score, combined_score, \
               is_relevant, created_at";

/// Inserts or replaces the scores for each `(exposure_id, brand)` in one
/// transaction, so an exposure is either fully scored or not scored at all.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any upsert fails; nothing is committed then.
pub async fn upsert_scores(pool: &PgPool, scores: &[NewScore]) -> Result<Vec<ScoreRow>, DbError> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(scores.len());
    for score in scores {
        let row = sqlx::query_as::<_, ScoreRow>(UPSERT_SCORE)
            .bind(score.exposure_id)
            .bind(&score.brand)
            .bind(score_to_decimal(score.rule_score))
            .bind(score_to_decimal(score.semantic_score))
            .bind(score_to_decimal(score.combined_score))
            .bind(score.is_relevant)
            .fetch_one(&mut *tx)
            .await?;
        rows.push(row);
    }
    tx.commit().await?;
    Ok(rows)
}

/// Returns every score attached to the exposures of a run, ordered by
/// exposure position then brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scores_for_run(pool: &PgPool, run_id: i64) -> Result<Vec<ScoreRow>, DbError> {
    let rows = sqlx::query_as::<_, ScoreRow>(
        "SELECT s.id, s.exposure_id, s.brand, s.rule_score, s.semantic_score, \
                s.combined_score, s.is_relevant, s.created_at \
         FROM scores s \
         JOIN exposures e ON e.id = s.exposure_id \
         WHERE e.run_id = $1 \
         ORDER BY e.position, s.brand",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
