use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("blocked by {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("browser error: {0}")]
    Browser(String),

    /// No browser could be launched or leased; no page can be rendered.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{stage} returned {len} chars, need at least {min}")]
    InsufficientContent {
        stage: &'static str,
        len: usize,
        min: usize,
    },

    #[error("vision provider error: {0}")]
    Vision(String),
}

impl ScraperError {
    /// `true` for failures where the page or transport refused us, as opposed
    /// to a page that loaded but had too little text.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScraperError::InsufficientContent { .. })
    }
}
