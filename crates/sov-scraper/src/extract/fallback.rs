//! Last-resort content for OCR-eligible pages: image transcription through a
//! vision model, then page metadata gated on a literal brand mention.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{json, Value};
use sov_core::literal_brand_match;
use url::Url;

use crate::error::ScraperError;
use crate::text::{normalize_whitespace, selector};

pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const MAX_IMAGES: usize = 3;
/// Declared width or height below this marks decoration, not content.
pub const MIN_IMAGE_SIDE_PX: u32 = 100;
pub const MIN_OCR_CHARS: usize = 10;

const IMAGE_REGIONS: &[&str] = &[".se-main-container", "#postViewArea", "article", "body"];

static DECORATIVE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)icon|logo|btn|button|banner|sprite|emoji|profile")
        .expect("valid decorative image regex")
});

const OCR_PROMPT: &str = "Transcribe all readable text in these images. \
List brand, company and product names first. Reply with plain text only.";

/// Up to [`MAX_IMAGES`] content image URLs from the page's main region,
/// resolved against `page_url`.
#[must_use]
pub fn image_candidates(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let Some(img) = selector("img") else {
        return Vec::new();
    };

    let region = IMAGE_REGIONS.iter().find_map(|css| {
        let sel = selector(css)?;
        document.select(&sel).next()
    });
    let Some(region) = region else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for element in region.select(&img) {
        let Some(src) = image_source(element) else {
            continue;
        };
        if is_too_small(element) || DECORATIVE_IMAGE.is_match(&src) {
            continue;
        }
        let resolved = match &base {
            Some(base) => match base.join(&src) {
                Ok(url) => url.to_string(),
                Err(_) => continue,
            },
            None => src,
        };
        if !resolved.starts_with("http") || out.contains(&resolved) {
            continue;
        }
        out.push(resolved);
        if out.len() == MAX_IMAGES {
            break;
        }
    }
    out
}

fn image_source(element: ElementRef<'_>) -> Option<String> {
    ["data-lazy-src", "data-src", "src"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(str::to_string)
}

fn is_too_small(element: ElementRef<'_>) -> bool {
    ["width", "height"].iter().any(|attr| {
        element
            .value()
            .attr(attr)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
            .is_some_and(|px| px < MIN_IMAGE_SIDE_PX)
    })
}

/// Page title and description, preferring Open Graph tags.
#[must_use]
pub fn page_metadata(html: &str) -> (Option<String>, Option<String>) {
    let document = Html::parse_document(html);
    let meta = |css: &str| {
        selector(css)
            .and_then(|sel| document.select(&sel).next())
            .and_then(|el| el.value().attr("content"))
            .map(normalize_whitespace)
            .filter(|v| !v.is_empty())
    };

    let title = meta(r#"meta[property="og:title"]"#).or_else(|| {
        selector("title")
            .and_then(|sel| document.select(&sel).next())
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|v| !v.is_empty())
    });
    let description =
        meta(r#"meta[property="og:description"]"#).or_else(|| meta(r#"meta[name="description"]"#));
    (title, description)
}

/// Title, description and search title joined, or `None` unless at least one
/// of `brands` appears literally in the combined text.
#[must_use]
pub fn metadata_content(
    html: Option<&str>,
    search_title: Option<&str>,
    brands: &[String],
) -> Option<String> {
    let (title, description) = html.map(page_metadata).unwrap_or_default();
    let combined = normalize_whitespace(
        &[title.as_deref(), description.as_deref(), search_title]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
    );
    if combined.is_empty() {
        return None;
    }
    brands
        .iter()
        .any(|brand| literal_brand_match(&combined, brand))
        .then_some(combined)
}

/// OpenAI-compatible chat-completions client used for image transcription.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl VisionClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            timeout,
        }
    }

    /// Points the client at a different completions endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transcribes visible text from `images` in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] on transport failure,
    /// [`ScraperError::UnexpectedStatus`] on a non-2xx response, and
    /// [`ScraperError::Vision`] when the response carries no message text.
    pub async fn transcribe(&self, images: &[String]) -> Result<String, ScraperError> {
        let mut content = vec![json!({ "type": "text", "text": OCR_PROMPT })];
        content.extend(
            images
                .iter()
                .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
        );
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": 800,
            "temperature": 0
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body: Value = response.json().await?;
        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .map(normalize_whitespace)
            .ok_or_else(|| ScraperError::Vision("response has no message content".to_string()))
    }
}
