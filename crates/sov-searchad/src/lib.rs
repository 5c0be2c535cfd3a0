//! Client for the Naver search-advertising keyword tool and the Naver open
//! APIs (`DataLab` trend and per-channel document counts).
//!
//! Used alongside share-of-voice runs to size a market keyword: absolute
//! monthly search volume, its monthly trend, and how much content each
//! search channel holds for it.

pub mod client;
pub mod error;
pub mod normalize;
mod retry;
pub mod signing;
pub mod types;

pub use client::{AdCredentials, OpenApiCredentials, SearchAdClient};
pub use error::SearchAdError;
pub use normalize::{estimate_monthly_volume, parse_count};
pub use types::{ChannelCounts, KeywordVolume, MonthlyVolume, TrendPoint, VolumeEstimate};
