//! TEI (Text Embeddings Inference) client for vector generation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ScoringError;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces one embedding vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScoringError`] if the provider fails or returns the wrong
    /// number of vectors.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError>;
}

/// TEI HTTP client.
#[derive(Debug, Clone)]
pub struct TeiClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
    truncate: bool,
}

impl TeiClient {
    /// Create a new `TeiClient` for the server at `tei_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Http`] if the HTTP client cannot be built.
    pub fn new(tei_url: &str) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Embedder for TeiClient {
    /// Texts are batched into groups of [`BATCH_SIZE`] (64) per request.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScoringError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest {
                inputs: chunk,
                truncate: true,
            };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ScoringError::Tei(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(ScoringError::Tei(format!(
                    "TEI returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| ScoringError::Tei(format!("TEI response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(ScoringError::Tei(format!(
                    "TEI returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embed_posts_inputs_and_returns_vectors_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_partial_json(json!({ "inputs": ["a", "b"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0, 0.0], [0.0, 1.0]])))
            .expect(1)
            .mount(&server)
            .await;

        let client = TeiClient::new(&format!("{}/", server.uri())).unwrap();
        let vectors = client.embed(&["a", "b"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_splits_large_inputs_into_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(|req: &wiremock::Request| {
                let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
                let n = body["inputs"].as_array().unwrap().len();
                ResponseTemplate::new(200).set_body_json(vec![vec![0.5_f32; 3]; n])
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = TeiClient::new(&server.uri()).unwrap();
        let texts = vec!["text"; 70];
        let vectors = client.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 70);
    }

    #[tokio::test]
    async fn embed_rejects_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[1.0]])))
            .mount(&server)
            .await;

        let client = TeiClient::new(&server.uri()).unwrap();
        let err = client.embed(&["a", "b"]).await.unwrap_err();
        assert!(matches!(err, ScoringError::Tei(msg) if msg.contains("1 embeddings for 2")));
    }

    #[tokio::test]
    async fn embed_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = TeiClient::new(&server.uri()).unwrap();
        let err = client.embed(&["a"]).await.unwrap_err();
        assert!(matches!(err, ScoringError::Tei(msg) if msg.contains("503")));
    }
}
