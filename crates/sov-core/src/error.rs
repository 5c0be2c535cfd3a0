use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("market keyword must be non-empty")]
    EmptyKeyword,

    #[error("a run needs between 1 and {max} brands, got {got}")]
    BrandCount { got: usize, max: usize },

    #[error("unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
