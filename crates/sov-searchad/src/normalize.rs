//! Turns raw keyword-tool and trend responses into volumes.

use crate::types::{KeywordToolRow, KeywordVolume, MonthlyVolume, TrendPoint, VolumeEstimate};

/// Volume reported in place of the tool's `"< 10"` bucket.
pub const BELOW_TEN_VOLUME: u64 = 5;

/// Reads a keyword-tool count. `"< 10"` counts as [`BELOW_TEN_VOLUME`];
/// anything unparseable counts as zero.
#[must_use]
pub fn parse_count(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(round_to_u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.starts_with('<') {
                BELOW_TEN_VOLUME
            } else {
                s.replace(',', "").parse().unwrap_or(0)
            }
        }
        _ => 0,
    }
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// The row whose keyword equals `keyword` ignoring whitespace and case, else
/// the first row.
#[must_use]
pub fn pick_keyword_row<'a>(rows: &'a [KeywordToolRow], keyword: &str) -> Option<&'a KeywordToolRow> {
    let wanted = squash(keyword);
    rows.iter()
        .find(|row| squash(&row.rel_keyword) == wanted)
        .or_else(|| rows.first())
}

#[must_use]
pub fn keyword_volume(row: &KeywordToolRow) -> KeywordVolume {
    let pc_volume = parse_count(&row.monthly_pc_qc_cnt);
    let mobile_volume = parse_count(&row.monthly_mobile_qc_cnt);
    KeywordVolume {
        keyword: row.rel_keyword.clone(),
        pc_volume,
        mobile_volume,
        total_volume: pc_volume + mobile_volume,
        competition: row.comp_idx.clone(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_u64(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

fn growth(current: u64, previous: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = (current as f64 - previous as f64) / previous as f64 * 100.0;
    Some(pct)
}

/// Scales trend ratios so the most recent month equals `current_total`.
///
/// A zero last ratio gives a zero multiplier. Month-over-month growth needs
/// two points, year-over-year needs thirteen; both are `None` when the
/// earlier month's volume is zero.
#[must_use]
pub fn estimate_monthly_volume(current_total: u64, points: &[TrendPoint]) -> VolumeEstimate {
    let last_ratio = points.last().map_or(0.0, |p| p.ratio);
    #[allow(clippy::cast_precision_loss)]
    let multiplier = if last_ratio > 0.0 {
        current_total as f64 / last_ratio
    } else {
        0.0
    };

    let months: Vec<MonthlyVolume> = points
        .iter()
        .map(|p| MonthlyVolume {
            period: p.period.clone(),
            volume: round_to_u64(p.ratio * multiplier),
        })
        .collect();

    let n = months.len();
    let mom_growth = (n >= 2)
        .then(|| growth(months[n - 1].volume, months[n - 2].volume))
        .flatten();
    let yoy_growth = (n >= 13)
        .then(|| growth(months[n - 1].volume, months[n - 13].volume))
        .flatten();

    VolumeEstimate {
        months,
        mom_growth,
        yoy_growth,
    }
}
