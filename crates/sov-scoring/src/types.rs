use serde::Serialize;

/// Relevance of one page to one brand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelevanceScore {
    /// Lexical evidence in `[0, 1]`; `1.0` only for a literal mention.
    pub rule_score: f64,
    /// Cosine similarity in `[-1, 1]`.
    pub semantic_score: f64,
    pub combined_score: f64,
    pub is_relevant: bool,
}
