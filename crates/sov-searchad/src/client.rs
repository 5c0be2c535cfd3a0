//! HTTP client for the Naver search-advertising and open APIs.
//!
//! Wraps `reqwest` with request signing, credential management and typed
//! response deserialization. Keyword volumes and channel counts are cached
//! per keyword for five minutes.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use sov_core::{AppConfig, ResultCache};

use crate::error::SearchAdError;
use crate::normalize::{estimate_monthly_volume, keyword_volume, pick_keyword_row};
use crate::retry::retry_with_backoff;
use crate::signing::signature;
use crate::types::{
    ChannelCounts, ChannelSearchResponse, KeywordToolResponse, KeywordVolume, TrendPoint,
    TrendResponse, VolumeEstimate, CHANNELS,
};

const DEFAULT_AD_BASE_URL: &str = "https://api.searchad.naver.com/";
const DEFAULT_OPEN_BASE_URL: &str = "https://openapi.naver.com/";
/// Path signed into `X-Signature`; never includes the query string.
const KEYWORD_TOOL_URI: &str = "/keywordstool";

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_MAX_ENTRIES: usize = 500;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
/// Error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Search-advertising API key pair and customer id.
#[derive(Clone)]
pub struct AdCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub customer_id: String,
}

impl std::fmt::Debug for AdCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdCredentials")
            .field("api_key", &"[redacted]")
            .field("secret_key", &"[redacted]")
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

/// Open API (`DataLab`, search) client id and secret.
#[derive(Clone)]
pub struct OpenApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OpenApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// Client for keyword volume, trend and channel-count lookups.
///
/// Either credential set may be absent; calls that need it then fail with
/// [`SearchAdError::MissingCredentials`]. Use [`SearchAdClient::with_base_urls`]
/// to point at a mock server in tests.
pub struct SearchAdClient {
    client: Client,
    ad: Option<AdCredentials>,
    open: Option<OpenApiCredentials>,
    ad_base: Url,
    open_base: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    volume_cache: ResultCache<String, KeywordVolume>,
    channel_cache: ResultCache<String, ChannelCounts>,
}

fn parse_base(url: &str) -> Result<Url, SearchAdError> {
    // A trailing slash makes `join` append rather than replace the last segment.
    let normalised = format!("{}/", url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| SearchAdError::InvalidBaseUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

fn cache_key(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl SearchAdClient {
    /// Creates a client pointed at the production APIs.
    ///
    /// # Errors
    ///
    /// Returns [`SearchAdError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        ad: Option<AdCredentials>,
        open: Option<OpenApiCredentials>,
        timeout_secs: u64,
    ) -> Result<Self, SearchAdError> {
        Self::with_base_urls(
            ad,
            open,
            timeout_secs,
            DEFAULT_AD_BASE_URL,
            DEFAULT_OPEN_BASE_URL,
        )
    }

    /// Creates a client with custom base URLs (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SearchAdError::Http`] if the HTTP client cannot be built, or
    /// [`SearchAdError::InvalidBaseUrl`] if either base URL is invalid.
    pub fn with_base_urls(
        ad: Option<AdCredentials>,
        open: Option<OpenApiCredentials>,
        timeout_secs: u64,
        ad_base_url: &str,
        open_base_url: &str,
    ) -> Result<Self, SearchAdError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sov/0.1 (keyword-volume)")
            .build()?;

        Ok(Self {
            client,
            ad,
            open,
            ad_base: parse_base(ad_base_url)?,
            open_base: parse_base(open_base_url)?,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            volume_cache: ResultCache::new(CACHE_TTL, CACHE_MAX_ENTRIES),
            channel_cache: ResultCache::new(CACHE_TTL, CACHE_MAX_ENTRIES),
        })
    }

    /// Builds a client from whichever credentials the config carries.
    ///
    /// # Errors
    ///
    /// Returns [`SearchAdError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SearchAdError> {
        let ad = match (
            &config.naver_ad_api_key,
            &config.naver_ad_secret_key,
            &config.naver_ad_customer_id,
        ) {
            (Some(api_key), Some(secret_key), Some(customer_id)) => Some(AdCredentials {
                api_key: api_key.clone(),
                secret_key: secret_key.clone(),
                customer_id: customer_id.clone(),
            }),
            _ => None,
        };
        let open = match (&config.naver_client_id, &config.naver_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(OpenApiCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        };
        Self::new(ad, open, config.http_timeout_secs)
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Current monthly PC + mobile search volume for `keyword`.
    ///
    /// Spaces are removed from the hint keyword. The row matching the keyword
    /// (ignoring whitespace) is used, else the first related keyword.
    ///
    /// # Errors
    ///
    /// - [`SearchAdError::MissingCredentials`] without ad credentials.
    /// - [`SearchAdError::NoResults`] if the tool returns no rows.
    /// - [`SearchAdError::Api`] / [`SearchAdError::Http`] on request failure.
    /// - [`SearchAdError::Deserialize`] if the response shape is unexpected.
    pub async fn keyword_volume(&self, keyword: &str) -> Result<KeywordVolume, SearchAdError> {
        let key = cache_key(keyword);
        if let Some(hit) = self.volume_cache.get(&key) {
            return Ok(hit);
        }
        let creds = self
            .ad
            .as_ref()
            .ok_or(SearchAdError::MissingCredentials("search advertising"))?;

        let hint: String = keyword.chars().filter(|c| !c.is_whitespace()).collect();
        let mut url = self.ad_join("keywordstool")?;
        url.query_pairs_mut()
            .append_pair("hintKeywords", &hint)
            .append_pair("showDetail", "1");

        let response: KeywordToolResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                async move {
                    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
                    let signed = signature(&creds.secret_key, &timestamp, "GET", KEYWORD_TOOL_URI);
                    let response = self
                        .client
                        .get(url)
                        .header("X-Timestamp", &timestamp)
                        .header("X-API-KEY", &creds.api_key)
                        .header("X-Customer", &creds.customer_id)
                        .header("X-Signature", signed)
                        .send()
                        .await?;
                    read_json("keywordstool", response).await
                }
            })
            .await?;

        let row = pick_keyword_row(&response.keyword_list, keyword)
            .ok_or_else(|| SearchAdError::NoResults(keyword.to_owned()))?;
        let volume = keyword_volume(row);
        tracing::debug!(
            keyword,
            matched = %volume.keyword,
            total = volume.total_volume,
            "keyword volume fetched"
        );
        self.volume_cache.set(key, volume.clone());
        Ok(volume)
    }

    /// Monthly relative search interest between `start` and `end`.
    ///
    /// # Errors
    ///
    /// - [`SearchAdError::MissingCredentials`] without open API credentials.
    /// - [`SearchAdError::Api`] / [`SearchAdError::Http`] on request failure.
    /// - [`SearchAdError::Deserialize`] if the response shape is unexpected.
    pub async fn trend(
        &self,
        keyword: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrendPoint>, SearchAdError> {
        let creds = self.open_credentials()?;
        let url = self.open_join("v1/datalab/search")?;
        let body = serde_json::json!({
            "startDate": start.format("%Y-%m-%d").to_string(),
            "endDate": end.format("%Y-%m-%d").to_string(),
            "timeUnit": "month",
            "keywordGroups": [{ "groupName": keyword, "keywords": [keyword] }],
        });

        let response: TrendResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                let body = &body;
                async move {
                    let response = self
                        .client
                        .post(url)
                        .header("X-Naver-Client-Id", &creds.client_id)
                        .header("X-Naver-Client-Secret", &creds.client_secret)
                        .json(body)
                        .send()
                        .await?;
                    read_json("datalab", response).await
                }
            })
            .await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .map(|group| group.data)
            .unwrap_or_default())
    }

    /// Current volume plus the trend rescaled into absolute monthly volumes.
    ///
    /// The trend is requested for the keyword as the keyword tool spells it.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::keyword_volume`] and [`Self::trend`].
    pub async fn monthly_volume(
        &self,
        keyword: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(KeywordVolume, VolumeEstimate), SearchAdError> {
        let volume = self.keyword_volume(keyword).await?;
        let points = self.trend(&volume.keyword, start, end).await?;
        let estimate = estimate_monthly_volume(volume.total_volume, &points);
        Ok((volume, estimate))
    }

    /// Indexed document totals for `keyword` on every channel in [`CHANNELS`].
    ///
    /// # Errors
    ///
    /// Fails if any of the channel lookups fails.
    pub async fn channel_counts(&self, keyword: &str) -> Result<ChannelCounts, SearchAdError> {
        let key = cache_key(keyword);
        if let Some(hit) = self.channel_cache.get(&key) {
            return Ok(hit);
        }
        let [blog_ch, news_ch, cafe_ch, web_ch] = CHANNELS;
        let (blog, news, cafearticle, webkr) = futures::try_join!(
            self.channel_total(blog_ch, keyword),
            self.channel_total(news_ch, keyword),
            self.channel_total(cafe_ch, keyword),
            self.channel_total(web_ch, keyword),
        )?;
        let counts = ChannelCounts {
            blog,
            news,
            cafearticle,
            webkr,
        };
        self.channel_cache.set(key, counts);
        Ok(counts)
    }

    async fn channel_total(&self, channel: &str, keyword: &str) -> Result<u64, SearchAdError> {
        let creds = self.open_credentials()?;
        let mut url = self.open_join(&format!("v1/search/{channel}.json"))?;
        url.query_pairs_mut()
            .append_pair("query", keyword.trim())
            .append_pair("display", "1");

        let response: ChannelSearchResponse =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                let url = url.clone();
                async move {
                    let response = self
                        .client
                        .get(url)
                        .header("X-Naver-Client-Id", &creds.client_id)
                        .header("X-Naver-Client-Secret", &creds.client_secret)
                        .send()
                        .await?;
                    read_json("search", response).await
                }
            })
            .await?;
        Ok(response.total)
    }

    fn open_credentials(&self) -> Result<&OpenApiCredentials, SearchAdError> {
        self.open
            .as_ref()
            .ok_or(SearchAdError::MissingCredentials("open API"))
    }

    fn ad_join(&self, path: &str) -> Result<Url, SearchAdError> {
        join(&self.ad_base, path)
    }

    fn open_join(&self, path: &str) -> Result<Url, SearchAdError> {
        join(&self.open_base, path)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, SearchAdError> {
    base.join(path).map_err(|e| SearchAdError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Asserts a 2xx status and parses the body as `T`.
async fn read_json<T: DeserializeOwned>(
    api: &'static str,
    response: Response,
) -> Result<T, SearchAdError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SearchAdError::Api {
            api,
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    serde_json::from_str(&body).map_err(|e| SearchAdError::Deserialize {
        context: url,
        source: e,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
