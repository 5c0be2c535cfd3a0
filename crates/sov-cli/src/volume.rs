//! `volume` command: search demand and indexed document counts for a keyword.

use anyhow::Context;
use chrono::{Months, NaiveDate, Utc};
use sov_core::AppConfig;
use sov_searchad::{SearchAdClient, SearchAdError};

/// Monthly trend window; 13 points are needed for a year-over-year figure.
const TREND_MONTHS: u32 = 13;

fn trend_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(TREND_MONTHS))
        .unwrap_or(today);
    (start, today)
}

/// Prints keyword volume, the estimated monthly series and channel counts as
/// JSON. Sections whose credentials are missing are skipped with a note.
///
/// # Errors
///
/// Returns an error if the client cannot be built, a lookup fails for a
/// reason other than missing credentials, or serialization fails.
pub(crate) async fn run_volume(config: &AppConfig, keyword: &str) -> anyhow::Result<()> {
    let keyword = sov_core::normalize_keyword(keyword)?;
    let client =
        SearchAdClient::from_app_config(config).context("failed to build search API client")?;

    let (start, end) = trend_window(Utc::now().date_naive());
    match client.monthly_volume(&keyword, start, end).await {
        Ok((volume, estimate)) => {
            println!("{}", serde_json::to_string_pretty(&volume)?);
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Err(SearchAdError::MissingCredentials(api)) => {
            println!("skipping search volume: {api} credentials are not configured");
        }
        Err(e) => return Err(e.into()),
    }

    match client.channel_counts(&keyword).await {
        Ok(counts) => {
            println!("{}", serde_json::to_string_pretty(&counts)?);
            println!("total documents: {}", counts.total());
        }
        Err(SearchAdError::MissingCredentials(api)) => {
            println!("skipping channel counts: {api} credentials are not configured");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_spans_thirteen_months() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let (start, end) = trend_window(today);
        assert_eq!(end, today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }
}
