//! Rule, semantic and combined brand relevance scores.

use std::collections::HashMap;

use sov_core::literal_brand_match;

use crate::embeddings::Embedder;
use crate::error::ScoringError;
use crate::types::RelevanceScore;

pub const RULE_WEIGHT: f64 = 0.4;
pub const SEMANTIC_WEIGHT: f64 = 0.6;
/// A partial token match never scores above this.
pub const PARTIAL_MATCH_CEILING: f64 = 0.8;
pub const RULE_THRESHOLD: f64 = 0.8;
pub const COMBINED_THRESHOLD: f64 = 0.72;
/// Brand tokens shorter than this (in characters) are ignored.
pub const MIN_TOKEN_CHARS: usize = 2;
/// Content is cut to this many characters before embedding.
pub const EMBEDDING_INPUT_CHARS: usize = 2_000;

/// Text embedded once per brand to anchor its semantic neighbourhood.
#[must_use]
pub fn brand_context_text(brand: &str) -> String {
    format!("{} 브랜드 제품 회사 서비스", brand.trim())
}

/// `1.0` on a literal mention, otherwise the fraction of the brand's
/// tokens found in `content`, scaled by [`PARTIAL_MATCH_CEILING`].
#[must_use]
pub fn rule_score(content: &str, brand: &str) -> f64 {
    if literal_brand_match(content, brand) {
        return 1.0;
    }

    let haystack = content.to_lowercase();
    let tokens: Vec<String> = brand
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }

    let matched = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    #[allow(clippy::cast_precision_loss)]
    let fraction = matched as f64 / tokens.len() as f64;
    fraction * PARTIAL_MATCH_CEILING
}

/// Cosine similarity; `0.0` when lengths differ or either vector is zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[must_use]
pub fn combined_score(rule: f64, semantic: f64) -> f64 {
    RULE_WEIGHT * rule + SEMANTIC_WEIGHT * semantic
}

#[must_use]
pub fn is_relevant(rule: f64, combined: f64, literal_match: bool) -> bool {
    literal_match || rule >= RULE_THRESHOLD || combined >= COMBINED_THRESHOLD
}

/// Scores `content` against `brand` given both embeddings.
#[must_use]
pub fn score(
    content: &str,
    brand: &str,
    content_embedding: &[f32],
    brand_embedding: &[f32],
) -> RelevanceScore {
    let literal = literal_brand_match(content, brand);
    let rule_score = rule_score(content, brand);
    let semantic_score = cosine_similarity(content_embedding, brand_embedding);
    let combined_score = combined_score(rule_score, semantic_score);
    RelevanceScore {
        rule_score,
        semantic_score,
        combined_score,
        is_relevant: is_relevant(rule_score, combined_score, literal),
    }
}

fn embedding_input(content: &str) -> &str {
    match content.char_indices().nth(EMBEDDING_INPUT_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Scores pages against a fixed brand list, reusing brand embeddings
/// computed once up front.
///
/// Without an embedder every semantic score is `0.0`, so only the rule
/// score can make a page relevant.
pub struct BrandScorer<'e> {
    embedder: Option<&'e dyn Embedder>,
    brands: Vec<String>,
    brand_embeddings: HashMap<String, Vec<f32>>,
}

impl<'e> BrandScorer<'e> {
    /// Embeds the context text of every brand in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] if the brand embeddings cannot be computed.
    pub async fn prepare(
        embedder: Option<&'e dyn Embedder>,
        brands: &[String],
    ) -> Result<BrandScorer<'e>, ScoringError> {
        let mut brand_embeddings = HashMap::new();
        if let Some(embedder) = embedder {
            let contexts: Vec<String> = brands.iter().map(|b| brand_context_text(b)).collect();
            let inputs: Vec<&str> = contexts.iter().map(String::as_str).collect();
            let vectors = embedder.embed(&inputs).await?;
            brand_embeddings = brands.iter().cloned().zip(vectors).collect();
            tracing::debug!(brands = brands.len(), "brand embeddings ready");
        }
        Ok(Self {
            embedder,
            brands: brands.to_vec(),
            brand_embeddings,
        })
    }

    #[must_use]
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    /// Scores `content` against every brand, in brand order.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] if the content embedding cannot be computed.
    pub async fn score_content(
        &self,
        content: &str,
    ) -> Result<Vec<(String, RelevanceScore)>, ScoringError> {
        let content_embedding = match self.embedder {
            Some(embedder) => embedder
                .embed(&[embedding_input(content)])
                .await?
                .pop()
                .ok_or_else(|| ScoringError::MissingEmbedding("content".to_string()))?,
            None => Vec::new(),
        };

        Ok(self
            .brands
            .iter()
            .map(|brand| {
                let brand_embedding = self
                    .brand_embeddings
                    .get(brand)
                    .map_or(&[][..], Vec::as_slice);
                let scored = score(content, brand, &content_embedding, brand_embedding);
                (brand.clone(), scored)
            })
            .collect())
    }
}
