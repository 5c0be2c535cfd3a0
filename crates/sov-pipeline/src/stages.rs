//! Crawl and extraction seams driven by the orchestrator.

use async_trait::async_trait;
use sov_core::Section;
use sov_scraper::{ContentExtractor, ExtractRequest, Extraction, SmartBlockCrawler};

use crate::error::PipelineError;

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Sections of the results page for `keyword`, in page order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Crawl`] when the page cannot be crawled at all.
    async fn crawl(&self, keyword: &str) -> Result<Vec<Section>, PipelineError>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Runs the fallback chain for one page. Never fails; a page with no
    /// usable content comes back with status `failed`.
    async fn extract(&self, request: ExtractRequest<'_>) -> Extraction;
}

#[async_trait]
impl Crawler for SmartBlockCrawler {
    async fn crawl(&self, keyword: &str) -> Result<Vec<Section>, PipelineError> {
        SmartBlockCrawler::crawl(self, keyword)
            .await
            .map_err(|e| PipelineError::Crawl(e.to_string()))
    }
}

#[async_trait]
impl Extractor for ContentExtractor {
    async fn extract(&self, request: ExtractRequest<'_>) -> Extraction {
        self.extract_request(&request).await
    }
}
