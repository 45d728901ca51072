//! HTTP fetcher for listing pages.
//!
//! Owns the connection pool and a global in-flight gate. Every attempt gets
//! fresh headers from [`crate::headers::build_headers`]; transient failures
//! are retried per [`RetryPolicy`]; blocked responses are surfaced at once.

mod batch;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bizscout_core::ScraperSettings;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::header::{HeaderMap, HOST};
use reqwest::{redirect, Client, Url};
use tokio::sync::Semaphore;

use crate::antibot;
use crate::error::FetchError;
use crate::headers::build_headers;
use crate::retry::{retry_with_backoff, RetryPolicy};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(20);

/// One successful response. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

pub struct Fetcher {
    client: Client,
    settings: ScraperSettings,
    gate: Arc<Semaphore>,
    rng: Mutex<StdRng>,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher whose header rotation is seeded from the OS.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(settings: &ScraperSettings) -> Result<Self, FetchError> {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Creates a fetcher with a fixed header-rotation seed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn with_seed(settings: &ScraperSettings, seed: u64) -> Result<Self, FetchError> {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &ScraperSettings, rng: StdRng) -> Result<Self, FetchError> {
        let timeout =
            Duration::try_from_secs_f64(settings.http_timeout_seconds).unwrap_or(FALLBACK_TIMEOUT);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(redirect::Policy::limited(settings.http_max_redirects))
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self {
            client,
            settings: settings.clone(),
            gate: Arc::new(Semaphore::new(settings.http_max_concurrency.max(1))),
            rng: Mutex::new(rng),
            retry: RetryPolicy::from_settings(settings),
        })
    }

    /// Capacity of the global in-flight gate.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.settings.http_max_concurrency.max(1)
    }

    /// Fetches one page, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` lacks a scheme or host (no retry).
    /// - [`FetchError::Blocked`] if the site refused the request (no retry).
    /// - [`FetchError::Http`] / [`FetchError::UnexpectedStatus`] after the
    ///   attempt budget is spent.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let parsed = parse_target(url)?;

        retry_with_backoff(
            self.retry,
            |attempt, delay, err| {
                tracing::warn!(
                    url,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient fetch error, retrying after backoff"
                );
            },
            || self.attempt(url, &parsed),
        )
        .await
    }

    async fn attempt(&self, url: &str, parsed: &Url) -> Result<FetchOutcome, FetchError> {
        let _permit = self.gate.acquire().await.map_err(|_| FetchError::Closed)?;

        let mut headers = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            build_headers(parsed, &self.settings, &mut *rng)
        };
        // The client derives Host per hop, which stays correct across redirects.
        headers.remove(HOST);

        let response = self
            .client
            .get(parsed.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if antibot::is_blocked_status(status) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        if !response.status().is_success() {
            return Err(FetchError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }

        let response_headers = response.headers().clone();
        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        if let Some(reason) = antibot::detect_block(status, &body) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                reason,
            });
        }

        tracing::debug!(url, final_url, status, bytes = body.len(), "fetched page");
        Ok(FetchOutcome {
            url: url.to_string(),
            final_url,
            status,
            body,
            headers: response_headers,
        })
    }

    /// Shuts the fetcher down, releasing pooled connections.
    pub fn close(self) {
        self.gate.close();
        drop(self.client);
        tracing::debug!("fetcher closed");
    }
}

/// Accepts only absolute `http`/`https` URLs with a host.
fn parse_target(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_rejects_missing_scheme() {
        let err = parse_target("listings.example.com/page").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(!err.is_retriable());
    }

    #[test]
    fn parse_target_rejects_non_http_scheme() {
        assert!(matches!(
            parse_target("ftp://listings.example.com/"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn parse_target_accepts_http_urls() {
        let url = parse_target(" https://listings.example.com/a?b=1 ").unwrap();
        assert_eq!(url.host_str(), Some("listings.example.com"));
    }

    #[tokio::test]
    async fn fetch_fails_fast_on_invalid_url() {
        let fetcher = Fetcher::with_seed(&ScraperSettings::default(), 1).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        fetcher.close();
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let settings = ScraperSettings {
            http_max_concurrency: 0,
            ..ScraperSettings::default()
        };
        let fetcher = Fetcher::with_seed(&settings, 1).unwrap();
        assert_eq!(fetcher.max_concurrency(), 1);
    }
}
