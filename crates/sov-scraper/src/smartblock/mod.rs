//! SmartBlock crawler: renders a search-results page and splits it into
//! ranked sections.

mod matchers;

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use sov_core::{ResultCache, Section, SectionKind};
use tokio::sync::Semaphore;

use crate::browser::{PageRenderer, RenderProfile};
use crate::error::ScraperError;

pub use matchers::{
    default_matchers, GenericMatcher, MatchedSection, NewsMatcher, PlaceMatcher, ReviewMatcher,
    SectionMatcher,
};

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Results-page URL with a `{keyword}` placeholder.
    pub url_template: String,
    pub timeout: Duration,
    /// Process-wide cap on simultaneous crawl sessions.
    pub max_concurrent: usize,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
}

impl CrawlerConfig {
    #[must_use]
    pub fn from_app_config(config: &sov_core::AppConfig) -> Self {
        Self {
            url_template: config.search_url_template.clone(),
            timeout: Duration::from_secs(config.crawl_timeout_secs),
            max_concurrent: config.crawl_max_concurrent,
            cache_ttl: Duration::from_secs(config.crawl_cache_ttl_secs),
            cache_max_entries: config.crawl_cache_max_entries,
        }
    }
}

/// Builds the results-page URL for `keyword`, percent-encoding it.
#[must_use]
pub fn search_url(template: &str, keyword: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    template.replace("{keyword}", &encoded)
}

/// Runs `matchers` in order over `html`, returns sections in page order with
/// any place section moved to the front.
#[must_use]
pub fn parse_sections_with(html: &str, matchers: &[Box<dyn SectionMatcher>]) -> Vec<Section> {
    let document = Html::parse_document(html);
    let mut claimed = Vec::new();
    let mut matched: Vec<MatchedSection> = Vec::new();

    for matcher in matchers {
        let found = matcher.match_sections(&document, &mut claimed);
        tracing::debug!(matcher = matcher.name(), sections = found.len(), "matcher ran");
        matched.extend(found);
    }

    matched.sort_by_key(|m| m.position);
    let mut sections: Vec<Section> = matched.into_iter().map(|m| m.section).collect();
    promote_place_section(&mut sections);
    sections
}

/// [`parse_sections_with`] using [`default_matchers`].
#[must_use]
pub fn parse_sections(html: &str) -> Vec<Section> {
    parse_sections_with(html, &default_matchers())
}

/// Moves the first place section, if any, to index 0.
pub fn promote_place_section(sections: &mut Vec<Section>) {
    if let Some(idx) = sections.iter().position(|s| s.kind == SectionKind::Place) {
        if idx > 0 {
            let place = sections.remove(idx);
            sections.insert(0, place);
        }
    }
}

/// Crawls search-results pages through a [`PageRenderer`].
///
/// Results are cached by trimmed, lower-cased keyword; empty results are never
/// cached. Crawl sessions are capped by a semaphore shared across all callers
/// of this instance.
pub struct SmartBlockCrawler {
    renderer: Arc<dyn PageRenderer>,
    config: CrawlerConfig,
    sessions: Arc<Semaphore>,
    cache: ResultCache<String, Vec<Section>>,
}

impl SmartBlockCrawler {
    #[must_use]
    pub fn new(renderer: Arc<dyn PageRenderer>, config: CrawlerConfig) -> Self {
        let sessions = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        let cache = ResultCache::new(config.cache_ttl, config.cache_max_entries);
        Self {
            renderer,
            config,
            sessions,
            cache,
        }
    }

    /// Returns the sections for `keyword`. Navigation, timeout and render
    /// errors on the page yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserUnavailable`] when no browser can be
    /// launched, since no crawl can succeed until that is fixed.
    pub async fn crawl(&self, keyword: &str) -> Result<Vec<Section>, ScraperError> {
        let key = keyword.trim().to_lowercase();
        if key.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(keyword = %key, "crawl cache hit");
            return Ok(hit);
        }

        let Ok(_permit) = self.sessions.acquire().await else {
            tracing::warn!(keyword = %key, "crawl semaphore closed");
            return Ok(Vec::new());
        };
        // Another caller may have filled the cache while this one waited.
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let url = search_url(&self.config.url_template, keyword.trim());
        let html = match self
            .renderer
            .render(&url, RenderProfile::Desktop, self.config.timeout)
            .await
        {
            Ok(html) => html,
            Err(e @ ScraperError::BrowserUnavailable(_)) => {
                tracing::error!(keyword = %key, url = %url, error = %e, "crawl browser unavailable");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(keyword = %key, url = %url, error = %e, "crawl failed");
                return Ok(Vec::new());
            }
        };

        let sections = parse_sections(&html);
        tracing::info!(
            keyword = %key,
            sections = sections.len(),
            posts = sections.iter().map(|s| s.posts.len()).sum::<usize>(),
            "crawl complete"
        );
        if !sections.is_empty() {
            self.cache.set(key, sections.clone());
        }
        Ok(sections)
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_tests;

#[cfg(test)]
#[path = "crawler_test.rs"]
mod crawler_tests;
