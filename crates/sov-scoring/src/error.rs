use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TEI embed error: {0}")]
    Tei(String),

    #[error("no embedding returned for {0}")]
    MissingEmbedding(String),
}
