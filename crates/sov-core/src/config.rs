use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_SEARCH_URL_TEMPLATE: &str =
    "https://search.naver.com/search.naver?where=nexearch&query={keyword}";

/// Upper bound for per-run extraction concurrency.
const MAX_EXTRACT_CONCURRENCY: usize = 5;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("expected a boolean, got '{other}'"),
                }),
            },
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SOV_ENV", "development"))?;
    let log_level = or_default("SOV_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SOV_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SOV_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SOV_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_url_template = or_default("SOV_SEARCH_URL_TEMPLATE", DEFAULT_SEARCH_URL_TEMPLATE);
    if !search_url_template.contains("{keyword}") {
        return Err(ConfigError::InvalidEnvVar {
            var: "SOV_SEARCH_URL_TEMPLATE".to_string(),
            reason: "template must contain a {keyword} placeholder".to_string(),
        });
    }

    let crawl_max_concurrent = parse_usize("SOV_CRAWL_MAX_CONCURRENT", "2")?.max(1);
    let crawl_timeout_secs = parse_u64("SOV_CRAWL_TIMEOUT_SECS", "45")?;
    let crawl_cache_ttl_secs = parse_u64("SOV_CRAWL_CACHE_TTL_SECS", "300")?;
    let crawl_cache_max_entries = parse_usize("SOV_CRAWL_CACHE_MAX_ENTRIES", "100")?;
    let extract_max_concurrent =
        parse_usize("SOV_EXTRACT_MAX_CONCURRENT", "3")?.clamp(1, MAX_EXTRACT_CONCURRENCY);
    let http_timeout_secs = parse_u64("SOV_HTTP_TIMEOUT_SECS", "10")?;
    let browser_timeout_secs = parse_u64("SOV_BROWSER_TIMEOUT_SECS", "20")?;
    let browser_recycle_after = parse_u32("SOV_BROWSER_RECYCLE_AFTER", "50")?.max(1);
    let content_max_chars = parse_usize("SOV_CONTENT_MAX_CHARS", "5000")?;

    let embedding_url = optional("SOV_EMBEDDING_URL");
    let vision_enabled = parse_bool("SOV_VISION_ENABLED", false)?;
    let vision_model = or_default("SOV_VISION_MODEL", "gpt-4o-mini");
    let openai_api_key = optional("OPENAI_API_KEY");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_url_template,
        crawl_max_concurrent,
        crawl_timeout_secs,
        crawl_cache_ttl_secs,
        crawl_cache_max_entries,
        extract_max_concurrent,
        http_timeout_secs,
        browser_timeout_secs,
        browser_recycle_after,
        content_max_chars,
        embedding_url,
        vision_enabled,
        vision_model,
        openai_api_key,
        naver_ad_api_key: optional("NAVER_AD_API_KEY"),
        naver_ad_secret_key: optional("NAVER_AD_SECRET_KEY"),
        naver_ad_customer_id: optional("NAVER_AD_CUSTOMER_ID"),
        naver_client_id: optional("NAVER_CLIENT_ID"),
        naver_client_secret: optional("NAVER_CLIENT_SECRET"),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SOV_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
