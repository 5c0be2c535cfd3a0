//! Content extraction: turns an exposure URL into cleaned body text.
//!
//! Each URL type gets an ordered chain of strategies (see [`chain`]). When
//! every strategy fails the extractor falls back to the search snippet, then
//! for blog-like pages to image transcription and page metadata
//! (see [`fallback`]). Extraction never returns an error; total failure is an
//! [`Extraction`] with no content and status `failed`.

pub mod chain;
pub mod fallback;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use reqwest::header::ACCEPT_LANGUAGE;
use sov_core::{AppConfig, ExtractionStatus, UrlType};
use url::Url;

use crate::browser::{PageRenderer, RenderProfile, DESKTOP_USER_AGENT};
use crate::error::ScraperError;
use crate::retry::retry_with_backoff;
use crate::text::{
    char_len, container_or_body_text, html_to_text, normalize_whitespace, truncate_chars,
};
use crate::urls::{classify_url, to_mobile_url};

use chain::{first_acceptable, Stage, StageOutput};
use fallback::{image_candidates, metadata_content, VisionClient, MIN_OCR_CHARS};

/// Post body containers on mobile blog and cafe pages, most specific first.
pub const BLOG_CONTAINERS: &[&str] = &[
    ".se-main-container",
    "#postViewArea",
    ".post_ct",
    "#postListBody",
    ".se_component_wrap",
    "#app .ArticleContentBox",
    ".article_viewer",
    ".tt_article_useless_p_margin",
    ".article_view",
    ".wrap_body",
];

/// Body containers on news and generic article pages.
pub const ARTICLE_CONTAINERS: &[&str] = &[
    "#dic_area",
    "#newsct_article",
    "#articleBodyContents",
    "[itemprop=articleBody]",
    ".article_body",
    ".article-body",
    ".news_content",
    "article",
    "main",
];

pub const MIN_BROWSER_CHARS: usize = 100;
/// Plain HTTP has no container heuristic, so the bar is higher.
pub const MIN_HTTP_CHARS: usize = 500;
/// A search snippet at least this long is used as content and suppresses OCR.
pub const MIN_API_SNIPPET_CHARS: usize = 50;

pub const VISION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub http_timeout: Duration,
    pub browser_timeout: Duration,
    /// Cap applied to every returned content string.
    pub max_chars: usize,
    pub http_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            browser_timeout: Duration::from_secs(20),
            max_chars: 5_000,
            http_retries: 1,
            backoff_base_ms: 250,
        }
    }
}

impl ExtractorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            browser_timeout: Duration::from_secs(config.browser_timeout_secs),
            max_chars: config.content_max_chars,
            ..Self::default()
        }
    }
}

/// Everything the extractor may use for one exposure.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    pub url: &'a str,
    /// Search-result description.
    pub snippet: Option<&'a str>,
    /// Search-result title, used by the metadata fallback.
    pub search_title: Option<&'a str>,
    /// Target brands; metadata is only accepted when one is mentioned.
    pub brands: &'a [String],
}

impl<'a> ExtractRequest<'a> {
    #[must_use]
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            snippet: None,
            search_title: None,
            brands: &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub content: Option<String>,
    pub status: ExtractionStatus,
    pub url_type: UrlType,
}

impl Extraction {
    fn accepted(content: String, status: ExtractionStatus, url_type: UrlType) -> Self {
        Self {
            content: Some(content),
            status,
            url_type,
        }
    }

    fn failed(url_type: UrlType) -> Self {
        Self {
            content: None,
            status: ExtractionStatus::Failed,
            url_type,
        }
    }
}

pub struct ContentExtractor {
    http: reqwest::Client,
    renderer: Arc<dyn PageRenderer>,
    vision: Option<VisionClient>,
    config: ExtractorConfig,
}

impl ContentExtractor {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        config: ExtractorConfig,
    ) -> Result<Self, ScraperError> {
        let http = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(config.http_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            http,
            renderer,
            vision: None,
            config,
        })
    }

    /// Builds an extractor from application config, enabling the vision
    /// fallback only when it is switched on and an API key is present.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(
        renderer: Arc<dyn PageRenderer>,
        config: &AppConfig,
    ) -> Result<Self, ScraperError> {
        let extractor = Self::new(renderer, ExtractorConfig::from_app_config(config))?;
        let vision = match (&config.openai_api_key, config.vision_enabled) {
            (Some(key), true) => Some(VisionClient::new(
                extractor.http.clone(),
                key.clone(),
                config.vision_model.clone(),
                VISION_TIMEOUT,
            )),
            (None, true) => {
                tracing::warn!("vision fallback enabled but OPENAI_API_KEY is not set");
                None
            }
            _ => None,
        };
        Ok(match vision {
            Some(vision) => extractor.with_vision(vision),
            None => extractor,
        })
    }

    #[must_use]
    pub fn with_vision(mut self, vision: VisionClient) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Extracts `url` using only the transport chain and the optional
    /// search snippet.
    pub async fn extract(&self, url: &str, snippet: Option<&str>) -> Extraction {
        let request = ExtractRequest {
            snippet,
            ..ExtractRequest::new(url)
        };
        self.extract_request(&request).await
    }

    /// Full extraction: transport chain, snippet, then image transcription
    /// and metadata for OCR-eligible pages.
    pub async fn extract_request(&self, request: &ExtractRequest<'_>) -> Extraction {
        let url = request.url.trim();
        let url_type = classify_url(url);
        if let Err(e) = Url::parse(url) {
            let err = ScraperError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            };
            tracing::warn!(error = %err, "skipping extraction");
            return Extraction::failed(url_type);
        }

        let outcome = first_acceptable(url, self.stages(url, url_type)).await;
        if let Some((stage, text)) = outcome.accepted {
            tracing::debug!(url, stage, url_type = %url_type, "content extracted");
            return Extraction::accepted(self.cap(&text), ExtractionStatus::Success, url_type);
        }

        let snippet = request
            .snippet
            .map(normalize_whitespace)
            .filter(|s| char_len(s) >= MIN_API_SNIPPET_CHARS);
        if let Some(snippet) = snippet {
            tracing::debug!(url, "using search snippet as content");
            return Extraction::accepted(self.cap(&snippet), ExtractionStatus::SuccessApi, url_type);
        }

        if url_type.is_ocr_eligible() {
            if let Some(extraction) = self
                .image_or_metadata(url, url_type, outcome.last_html, request)
                .await
            {
                return extraction;
            }
        }

        tracing::info!(url, url_type = %url_type, "extraction failed");
        Extraction::failed(url_type)
    }

    fn cap(&self, text: &str) -> String {
        truncate_chars(text, self.config.max_chars)
    }

    fn stages<'s>(&'s self, url: &'s str, url_type: UrlType) -> Vec<Stage<'s>> {
        let browser_timeout = self.config.browser_timeout;
        match url_type {
            UrlType::Blog | UrlType::View => vec![Stage::new(
                "mobile_browser",
                browser_timeout,
                MIN_BROWSER_CHARS,
                self.render_stage(to_mobile_url(url), RenderProfile::Mobile, BLOG_CONTAINERS)
                    .boxed(),
            )],
            UrlType::News | UrlType::Other => vec![
                Stage::new(
                    "http",
                    self.config.http_timeout,
                    MIN_HTTP_CHARS,
                    self.http_stage(url).boxed(),
                ),
                Stage::new(
                    "article_browser",
                    browser_timeout,
                    MIN_BROWSER_CHARS,
                    self.render_stage(url.to_string(), RenderProfile::Desktop, ARTICLE_CONTAINERS)
                        .boxed(),
                ),
            ],
        }
    }

    async fn render_stage(
        &self,
        url: String,
        profile: RenderProfile,
        containers: &'static [&'static str],
    ) -> Result<StageOutput, ScraperError> {
        let html = self
            .renderer
            .render(&url, profile, self.config.browser_timeout)
            .await?;
        let text = container_or_body_text(&html, containers);
        Ok(StageOutput {
            text,
            html: Some(html),
        })
    }

    async fn http_stage(&self, url: &str) -> Result<StageOutput, ScraperError> {
        let html = self.fetch_html(url).await?;
        let text = html_to_text(&html);
        Ok(StageOutput {
            text,
            html: Some(html),
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.config.http_retries, self.config.backoff_base_ms, || {
            let url = url.to_owned();
            async move {
                let response = self
                    .http
                    .get(&url)
                    .header(ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en;q=0.8")
                    .send()
                    .await?;
                let status = response.status().as_u16();
                if matches!(status, 401 | 403 | 451) {
                    return Err(ScraperError::Blocked { url, status });
                }
                if !response.status().is_success() {
                    return Err(ScraperError::UnexpectedStatus { status, url });
                }
                Ok(response.text().await?)
            }
        })
        .await
    }

    async fn image_or_metadata(
        &self,
        url: &str,
        url_type: UrlType,
        last_html: Option<String>,
        request: &ExtractRequest<'_>,
    ) -> Option<Extraction> {
        let page_url = to_mobile_url(url);
        let html = match last_html {
            Some(html) => Some(html),
            None => self.fetch_for_fallback(&page_url).await,
        };

        if let (Some(vision), Some(html)) = (&self.vision, html.as_deref()) {
            if let Some(text) = transcribe_images(vision, &page_url, html).await {
                return Some(Extraction::accepted(
                    self.cap(&text),
                    ExtractionStatus::SuccessOcr,
                    url_type,
                ));
            }
        }

        let metadata = metadata_content(html.as_deref(), request.search_title, request.brands)?;
        tracing::debug!(url, "using page metadata as content");
        Some(Extraction::accepted(
            self.cap(&metadata),
            ExtractionStatus::SuccessMetadata,
            url_type,
        ))
    }

    async fn fetch_for_fallback(&self, url: &str) -> Option<String> {
        match tokio::time::timeout(self.config.http_timeout, self.fetch_html(url)).await {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                tracing::debug!(url, error = %e, "fallback page fetch failed");
                None
            }
            Err(_) => {
                tracing::debug!(url, "fallback page fetch timed out");
                None
            }
        }
    }
}

async fn transcribe_images(vision: &VisionClient, page_url: &str, html: &str) -> Option<String> {
    let images = image_candidates(html, page_url);
    if images.is_empty() {
        tracing::debug!(url = page_url, "no images eligible for OCR");
        return None;
    }

    match tokio::time::timeout(vision.timeout(), vision.transcribe(&images)).await {
        Ok(Ok(text)) if char_len(&text) >= MIN_OCR_CHARS => Some(text),
        Ok(Ok(text)) => {
            tracing::debug!(url = page_url, len = char_len(&text), "OCR text too short");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(url = page_url, error = %e, "OCR failed");
            None
        }
        Err(_) => {
            tracing::warn!(url = page_url, "OCR timed out");
            None
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
