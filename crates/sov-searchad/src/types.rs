//! Search-API response types and the domain values derived from them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// keywordstool
// ---------------------------------------------------------------------------

/// `{ "keywordList": [ ... ] }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordToolResponse {
    #[serde(default)]
    pub keyword_list: Vec<KeywordToolRow>,
}

/// One related keyword. Counts are numbers, or the string `"< 10"` for
/// very small volumes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordToolRow {
    pub rel_keyword: String,
    pub monthly_pc_qc_cnt: serde_json::Value,
    pub monthly_mobile_qc_cnt: serde_json::Value,
    #[serde(default)]
    pub comp_idx: Option<String>,
}

/// Current monthly search volume for a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordVolume {
    /// Keyword as the tool spells it; may differ from the query in spacing.
    pub keyword: String,
    pub pc_volume: u64,
    pub mobile_volume: u64,
    pub total_volume: u64,
    /// Competition index label (e.g. "높음", "중간", "낮음").
    pub competition: Option<String>,
}

// ---------------------------------------------------------------------------
// DataLab search trend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TrendResponse {
    #[serde(default)]
    pub results: Vec<TrendGroup>,
}

#[derive(Debug, Deserialize)]
pub struct TrendGroup {
    #[serde(default)]
    pub data: Vec<TrendPoint>,
}

/// Relative search interest for one month, scaled so the peak is 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// First day of the month, `YYYY-MM-DD`.
    pub period: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyVolume {
    pub period: String,
    pub volume: u64,
}

/// Trend ratios rescaled into absolute monthly volumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeEstimate {
    pub months: Vec<MonthlyVolume>,
    /// Percent change of the last month over the one before.
    pub mom_growth: Option<f64>,
    /// Percent change of the last month over the same month a year earlier.
    pub yoy_growth: Option<f64>,
}

// ---------------------------------------------------------------------------
// Open search channels
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChannelSearchResponse {
    #[serde(default)]
    pub total: u64,
}

/// Search channels whose document totals are reported.
pub const CHANNELS: [&str; 4] = ["blog", "news", "cafearticle", "webkr"];

/// Total indexed documents per search channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub blog: u64,
    pub news: u64,
    pub cafearticle: u64,
    pub webkr: u64,
}

impl ChannelCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.blog + self.news + self.cafearticle + self.webkr
    }
}
