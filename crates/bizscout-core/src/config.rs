use crate::app_config::{AppConfig, Environment, ScraperSettings};
use crate::ConfigError;

/// Smallest accepted scheduler interval, matching the six-minute floor the
/// ingest loop has always enforced.
const MIN_CRON_INTERVAL_HOURS: f64 = 0.1;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional; unset variables fall back to the defaults in
/// [`ScraperSettings::default`]. Pools and blocklists accept a separated list
/// that replaces the default list wholesale.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::str::FromStr;

    fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let defaults = ScraperSettings::default();

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| parse_value::<usize>(var, &raw))
    };
    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| parse_value::<u32>(var, &raw))
    };
    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        lookup(var).map_or(Ok(default), |raw| parse_value::<u64>(var, &raw))
    };
    let parse_positive_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        let value = lookup(var).map_or(Ok(default), |raw| parse_value::<f64>(var, &raw))?;
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a non-negative number, got {value}"),
            })
        }
    };
    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("expected a boolean, got \"{other}\""),
                }),
            },
        }
    };
    let parse_list = |var: &str, separator: char, default: Vec<String>| -> Vec<String> {
        match lookup(var) {
            Err(_) => default,
            Ok(raw) => {
                let items: Vec<String> = raw
                    .split(separator)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToOwned::to_owned)
                    .collect();
                if items.is_empty() {
                    default
                } else {
                    items
                }
            }
        }
    };

    let env = parse_environment(&or_default("SCRAPER_ENVIRONMENT", "development"))?;
    let bind_addr = parse_value::<SocketAddr>(
        "SCRAPER_BIND_ADDR",
        &or_default("SCRAPER_BIND_ADDR", "0.0.0.0:8000"),
    )?;
    let log_level = or_default("SCRAPER_LOG_LEVEL", "info");
    let database_url = lookup("SCRAPER_DATABASE_URL")
        .or_else(|_| lookup("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty());

    let db_max_connections = parse_u32("SCRAPER_DB_MAX_CONNECTIONS", 10)?;
    let db_min_connections = parse_u32("SCRAPER_DB_MIN_CONNECTIONS", 1)?;
    let db_acquire_timeout_secs = parse_u64("SCRAPER_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

    let enable_scheduler = parse_bool("SCRAPER_ENABLE_SCHEDULER", true)?;
    let cron_interval_hours =
        parse_positive_f64("SCRAPER_CRON_INTERVAL_HOURS", 6.0)?.max(MIN_CRON_INTERVAL_HOURS);

    let scraper = ScraperSettings {
        http_timeout_seconds: parse_positive_f64(
            "SCRAPER_HTTP_TIMEOUT_SECONDS",
            defaults.http_timeout_seconds,
        )?,
        http_max_redirects: parse_usize("SCRAPER_HTTP_MAX_REDIRECTS", defaults.http_max_redirects)?,
        http_max_concurrency: parse_usize(
            "SCRAPER_HTTP_MAX_CONCURRENCY",
            defaults.http_max_concurrency,
        )?
        .max(1),
        http_retry_attempts: parse_u32("SCRAPER_HTTP_RETRY_ATTEMPTS", defaults.http_retry_attempts)?,
        http_retry_backoff_seconds: parse_positive_f64(
            "SCRAPER_HTTP_RETRY_BACKOFF_SECONDS",
            defaults.http_retry_backoff_seconds,
        )?,
        http_retry_backoff_factor: parse_positive_f64(
            "SCRAPER_HTTP_RETRY_BACKOFF_FACTOR",
            defaults.http_retry_backoff_factor,
        )?,
        user_agent_pool: parse_list("SCRAPER_USER_AGENT_POOL", ',', defaults.user_agent_pool),
        // Language values carry commas themselves, so this pool is `;`-separated.
        accept_language_pool: parse_list(
            "SCRAPER_ACCEPT_LANGUAGE_POOL",
            ';',
            defaults.accept_language_pool,
        ),
        request_max_urls: parse_usize("SCRAPER_REQUEST_MAX_URLS", defaults.request_max_urls)?,
        min_listing_title_words: parse_usize(
            "SCRAPER_MIN_LISTING_TITLE_WORDS",
            defaults.min_listing_title_words,
        )?,
        min_listing_text_length: parse_usize(
            "SCRAPER_MIN_LISTING_TEXT_LENGTH",
            defaults.min_listing_text_length,
        )?,
        min_listing_feature_length: parse_usize(
            "SCRAPER_MIN_LISTING_FEATURE_LENGTH",
            defaults.min_listing_feature_length,
        )?,
        junk_title_keywords: parse_list(
            "SCRAPER_JUNK_TITLE_KEYWORDS",
            ',',
            defaults.junk_title_keywords,
        ),
        junk_url_keywords: parse_list("SCRAPER_JUNK_URL_KEYWORDS", ',', defaults.junk_url_keywords),
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        enable_scheduler,
        cron_interval_hours,
        scraper,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SCRAPER_ENVIRONMENT".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
