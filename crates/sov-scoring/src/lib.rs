//! Brand relevance scoring.
//!
//! Combines a lexical rule score with the cosine similarity between a page's
//! embedding (via TEI) and a per-brand context embedding, then applies the
//! relevance thresholds.

pub mod embeddings;
pub mod error;
pub mod scorer;
pub mod types;

pub use embeddings::{Embedder, TeiClient};
pub use error::ScoringError;
pub use scorer::{
    brand_context_text, combined_score, cosine_similarity, is_relevant, rule_score, score,
    BrandScorer,
};
pub use types::RelevanceScore;
