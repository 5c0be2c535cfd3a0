//! Shared domain types, configuration, and the in-process result cache used
//! across the brand-exposure workspace.

pub mod app_config;
pub mod brands;
pub mod cache;
pub mod config;
pub mod error;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use brands::{literal_brand_match, normalize_brands, normalize_keyword, MAX_BRANDS};
pub use cache::ResultCache;
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use types::{
    ExtractionStatus, Post, RunStatus, Section, SectionKind, UrlType, PLACE_SECTION_TITLE,
};
