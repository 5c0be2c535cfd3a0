#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Results-page URL with a `{keyword}` placeholder.
    pub search_url_template: String,
    pub crawl_max_concurrent: usize,
    pub crawl_timeout_secs: u64,
    pub crawl_cache_ttl_secs: u64,
    pub crawl_cache_max_entries: usize,
    pub extract_max_concurrent: usize,
    pub http_timeout_secs: u64,
    pub browser_timeout_secs: u64,
    pub browser_recycle_after: u32,
    pub content_max_chars: usize,
    pub embedding_url: Option<String>,
    pub vision_enabled: bool,
    pub vision_model: String,
    pub openai_api_key: Option<String>,
    pub naver_ad_api_key: Option<String>,
    pub naver_ad_secret_key: Option<String>,
    pub naver_ad_customer_id: Option<String>,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("search_url_template", &self.search_url_template)
            .field("crawl_max_concurrent", &self.crawl_max_concurrent)
            .field("crawl_timeout_secs", &self.crawl_timeout_secs)
            .field("crawl_cache_ttl_secs", &self.crawl_cache_ttl_secs)
            .field("crawl_cache_max_entries", &self.crawl_cache_max_entries)
            .field("extract_max_concurrent", &self.extract_max_concurrent)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("browser_recycle_after", &self.browser_recycle_after)
            .field("content_max_chars", &self.content_max_chars)
            .field("embedding_url", &self.embedding_url)
            .field("vision_enabled", &self.vision_enabled)
            .field("vision_model", &self.vision_model)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("naver_ad_api_key", &redact(&self.naver_ad_api_key))
            .field("naver_ad_secret_key", &redact(&self.naver_ad_secret_key))
            .field("naver_ad_customer_id", &self.naver_ad_customer_id)
            .field("naver_client_id", &self.naver_client_id)
            .field("naver_client_secret", &redact(&self.naver_client_secret))
            .finish()
    }
}
