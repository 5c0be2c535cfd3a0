//! Per-brand and per-block-type share-of-voice aggregation.
//!
//! Aggregation is a pure function of the exposures of a run and which brands
//! each exposure was judged relevant to, so it can be recomputed from
//! persisted rows at any time.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sov_db::{ExposureRow, NewResult, NewResultByType, ScoreRow};

/// What one exposure contributes to the aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureSignal {
    pub exposure_id: i64,
    pub block_type: String,
    /// Brands this exposure was judged relevant to. Empty when extraction or
    /// scoring failed.
    pub relevant_brands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub results: Vec<NewResult>,
    pub by_type: Vec<NewResultByType>,
}

/// `count / total * 100` rounded to two places, `0.00` when `total` is zero.
#[must_use]
pub fn percentage(count: i32, total: i32) -> Decimal {
    let mut value = if total <= 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(count) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
    };
    value.rescale(2);
    value
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Builds one result row per brand and one by-type row per (block type,
/// brand) pair present among `signals`.
///
/// Block types keep their first-seen order in `signals`; brands keep the
/// order of `brands`. Relevance to a brand outside `brands` is ignored.
#[must_use]
pub fn aggregate(brands: &[String], signals: &[ExposureSignal]) -> Aggregates {
    let total = to_i32(signals.len());

    let mut block_types: Vec<&str> = Vec::new();
    let mut type_totals: HashMap<&str, i32> = HashMap::new();
    let mut brand_counts: HashMap<&str, i32> = HashMap::new();
    let mut type_brand_counts: HashMap<(&str, &str), i32> = HashMap::new();

    for signal in signals {
        let block_type = signal.block_type.as_str();
        let seen = type_totals.entry(block_type).or_insert(0);
        if *seen == 0 {
            block_types.push(block_type);
        }
        *seen += 1;

        let relevant: HashSet<&str> = signal.relevant_brands.iter().map(String::as_str).collect();
        for brand in brands.iter().filter(|b| relevant.contains(b.as_str())) {
            *brand_counts.entry(brand.as_str()).or_insert(0) += 1;
            *type_brand_counts
                .entry((block_type, brand.as_str()))
                .or_insert(0) += 1;
        }
    }

    let results = brands
        .iter()
        .map(|brand| {
            let exposure_count = brand_counts.get(brand.as_str()).copied().unwrap_or(0);
            NewResult {
                brand: brand.clone(),
                exposure_count,
                sov_percentage: percentage(exposure_count, total),
            }
        })
        .collect();

    let mut by_type = Vec::with_capacity(block_types.len() * brands.len());
    for block_type in block_types {
        let total_in_type = type_totals.get(block_type).copied().unwrap_or(0);
        for brand in brands {
            let exposure_count = type_brand_counts
                .get(&(block_type, brand.as_str()))
                .copied()
                .unwrap_or(0);
            by_type.push(NewResultByType {
                block_type: block_type.to_string(),
                brand: brand.clone(),
                exposure_count,
                total_in_type,
                percentage: percentage(exposure_count, total_in_type),
            });
        }
    }

    Aggregates { results, by_type }
}

/// Rebuilds the aggregates of a run from its persisted exposures and scores.
#[must_use]
pub fn recompute_results(
    brands: &[String],
    exposures: &[ExposureRow],
    scores: &[ScoreRow],
) -> Aggregates {
    let mut relevant: HashMap<i64, Vec<String>> = HashMap::new();
    for score in scores.iter().filter(|s| s.is_relevant) {
        relevant
            .entry(score.exposure_id)
            .or_default()
            .push(score.brand.clone());
    }

    let signals: Vec<ExposureSignal> = exposures
        .iter()
        .map(|e| ExposureSignal {
            exposure_id: e.id,
            block_type: e.block_type.clone(),
            relevant_brands: relevant.remove(&e.id).unwrap_or_default(),
        })
        .collect();

    aggregate(brands, &signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn brands() -> Vec<String> {
        vec!["Tesla".to_string(), "Hyundai".to_string()]
    }

    fn signal(id: i64, block_type: &str, relevant: &[&str]) -> ExposureSignal {
        ExposureSignal {
            exposure_id: id,
            block_type: block_type.to_string(),
            relevant_brands: relevant.iter().map(|b| (*b).to_string()).collect(),
        }
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3).to_string(), "33.33");
        assert_eq!(percentage(2, 3).to_string(), "66.67");
        assert_eq!(percentage(5, 5).to_string(), "100.00");
        assert_eq!(percentage(0, 0).to_string(), "0.00");
    }

    #[test]
    fn brand_counts_and_shares() {
        let signals = vec![
            signal(1, "News", &["Tesla"]),
            signal(2, "News", &["Tesla", "Hyundai"]),
            signal(3, "News", &[]),
            signal(4, "인기글", &["Hyundai"]),
        ];

        let agg = aggregate(&brands(), &signals);

        assert_eq!(agg.results.len(), 2);
        assert_eq!(agg.results[0].brand, "Tesla");
        assert_eq!(agg.results[0].exposure_count, 2);
        assert_eq!(agg.results[0].sov_percentage.to_string(), "50.00");
        assert_eq!(agg.results[1].exposure_count, 2);
    }

    #[test]
    fn by_type_rows_cover_every_type_and_brand() {
        let signals = vec![
            signal(1, "News", &["Tesla"]),
            signal(2, "인기글", &[]),
            signal(3, "News", &[]),
        ];

        let agg = aggregate(&brands(), &signals);

        let keys: Vec<(&str, &str)> = agg
            .by_type
            .iter()
            .map(|r| (r.block_type.as_str(), r.brand.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("News", "Tesla"),
                ("News", "Hyundai"),
                ("인기글", "Tesla"),
                ("인기글", "Hyundai"),
            ]
        );
        let news_tesla = &agg.by_type[0];
        assert_eq!(news_tesla.exposure_count, 1);
        assert_eq!(news_tesla.total_in_type, 2);
        assert_eq!(news_tesla.percentage.to_string(), "50.00");
        for row in &agg.by_type {
            assert!(row.exposure_count <= row.total_in_type);
            assert!(row.total_in_type <= 3);
        }
    }

    #[test]
    fn no_exposures_still_reports_every_brand_at_zero() {
        let agg = aggregate(&brands(), &[]);
        assert_eq!(agg.results.len(), 2);
        assert!(agg
            .results
            .iter()
            .all(|r| r.exposure_count == 0 && r.sov_percentage.to_string() == "0.00"));
        assert!(agg.by_type.is_empty());
    }

    #[test]
    fn unknown_brands_are_ignored() {
        let agg = aggregate(&brands(), &[signal(1, "News", &["Kia"])]);
        assert!(agg.results.iter().all(|r| r.exposure_count == 0));
    }

    fn exposure_row(id: i64, block_type: &str) -> ExposureRow {
        ExposureRow {
            id,
            run_id: 1,
            block_type: block_type.to_string(),
            title: String::new(),
            url: format!("https://example.com/{id}"),
            description: None,
            position: i32::try_from(id).unwrap(),
            content: None,
            extraction_status: "success".to_string(),
            url_type: Some("other".to_string()),
            created_at: Utc::now(),
        }
    }

    fn score_row(exposure_id: i64, brand: &str, is_relevant: bool) -> ScoreRow {
        ScoreRow {
            id: exposure_id * 10,
            exposure_id,
            brand: brand.to_string(),
            rule_score: Decimal::ONE,
            semantic_score: Decimal::ZERO,
            combined_score: Decimal::new(4, 1),
            is_relevant,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn recompute_matches_in_memory_aggregation() {
        let exposures = vec![exposure_row(1, "News"), exposure_row(2, "VIEW")];
        let scores = vec![
            score_row(1, "Tesla", true),
            score_row(1, "Hyundai", false),
            score_row(2, "Hyundai", true),
        ];

        let recomputed = recompute_results(&brands(), &exposures, &scores);
        let direct = aggregate(
            &brands(),
            &[signal(1, "News", &["Tesla"]), signal(2, "VIEW", &["Hyundai"])],
        );

        assert_eq!(recomputed, direct);
    }
}
