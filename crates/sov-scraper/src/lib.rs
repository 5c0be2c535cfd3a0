pub mod browser;
pub mod error;
pub mod extract;
mod retry;
pub mod smartblock;
pub mod text;
pub mod urls;

pub use browser::{BrowserLauncher, BrowserPool, ChromeRenderer, PageRenderer, RenderProfile};
pub use error::ScraperError;
pub use extract::fallback::VisionClient;
pub use extract::{ContentExtractor, ExtractRequest, Extraction, ExtractorConfig};
pub use smartblock::{parse_sections, CrawlerConfig, SmartBlockCrawler};
pub use urls::{classify_url, normalize_url, to_mobile_url};
