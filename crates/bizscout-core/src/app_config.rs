use std::net::SocketAddr;

use crate::ConfigError;

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

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

const DEFAULT_USER_AGENT_POOL: [&str; 4] = [
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

const DEFAULT_ACCEPT_LANGUAGE_POOL: [&str; 3] = [
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.8,fr;q=0.6",
];

const DEFAULT_JUNK_TITLE_KEYWORDS: [&str; 11] = [
    "contact", "privacy", "terms", "login", "register", "sitemap", "cookie", "about", "support",
    "export", "news",
];

const DEFAULT_JUNK_URL_KEYWORDS: [&str; 12] = [
    "contact",
    "privacy",
    "terms",
    "login",
    "register",
    "sitemap",
    "cookie",
    "about",
    "support",
    "export",
    "newsletter",
    "blog",
];

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Typed thresholds, pools and blocklists consumed by the fetch-and-extract
/// pipeline.
///
/// The pipeline never reads the environment itself; callers pass this value
/// into the fetcher and coordinator constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperSettings {
    pub http_timeout_seconds: f64,
    pub http_max_redirects: usize,
    /// Capacity of the global in-flight gate.
    pub http_max_concurrency: usize,
    /// Total attempts per URL, including the first.
    pub http_retry_attempts: u32,
    pub http_retry_backoff_seconds: f64,
    pub http_retry_backoff_factor: f64,
    pub user_agent_pool: Vec<String>,
    pub accept_language_pool: Vec<String>,
    pub request_max_urls: usize,
    pub min_listing_title_words: usize,
    pub min_listing_text_length: usize,
    pub min_listing_feature_length: usize,
    pub junk_title_keywords: Vec<String>,
    pub junk_url_keywords: Vec<String>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            http_timeout_seconds: 20.0,
            http_max_redirects: 5,
            http_max_concurrency: 8,
            http_retry_attempts: 3,
            http_retry_backoff_seconds: 0.75,
            http_retry_backoff_factor: 2.0,
            user_agent_pool: owned(&DEFAULT_USER_AGENT_POOL),
            accept_language_pool: owned(&DEFAULT_ACCEPT_LANGUAGE_POOL),
            request_max_urls: 50,
            min_listing_title_words: 2,
            min_listing_text_length: 40,
            min_listing_feature_length: 16,
            junk_title_keywords: owned(&DEFAULT_JUNK_TITLE_KEYWORDS),
            junk_url_keywords: owned(&DEFAULT_JUNK_URL_KEYWORDS),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Persistence and scheduling are disabled when this is `None`.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub enable_scheduler: bool,
    pub cron_interval_hours: f64,
    pub scraper: ScraperSettings,
}

impl AppConfig {
    /// Returns the database URL, or a [`ConfigError::FeatureDisabled`] naming
    /// `feature` when persistence is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FeatureDisabled`] if no database URL is set.
    pub fn require_database_url(&self, feature: &'static str) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::FeatureDisabled {
                feature,
                reason: "SCRAPER_DATABASE_URL is not configured".to_string(),
            })
    }

    /// The periodic ingest runs only with a database, outside the test
    /// environment, and when not switched off.
    #[must_use]
    pub fn scheduler_enabled(&self) -> bool {
        self.database_url.is_some() && self.enable_scheduler && self.env != Environment::Test
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("enable_scheduler", &self.enable_scheduler)
            .field("cron_interval_hours", &self.cron_interval_hours)
            .field("scraper", &self.scraper)
            .finish()
    }
}
