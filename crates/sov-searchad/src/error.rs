use thiserror::Error;

/// Errors returned by the search-API client.
#[derive(Debug, Error)]
pub enum SearchAdError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("{api} returned HTTP {status}: {body}")]
    Api {
        api: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Credentials for the named API are not configured.
    #[error("{0} credentials are not configured")]
    MissingCredentials(&'static str),

    /// The keyword tool returned no rows for the keyword.
    #[error("no search volume data for \"{0}\"")]
    NoResults(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
