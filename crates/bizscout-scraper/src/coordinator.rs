//! Batch orchestration: fetch, extract, validate, de-duplicate.

use std::collections::HashSet;
use std::time::Instant;

use bizscout_core::{
    BusinessRecord, ScrapeError, ScrapeMeta, ScrapeOutput, ScrapeStage, ScraperSettings,
};
use futures::StreamExt;

use crate::error::{ExtractError, FetchError};
use crate::extract::{extract_page, ExtractionCandidate};
use crate::fetcher::Fetcher;

/// What happened to one requested URL.
#[derive(Debug)]
pub enum PageOutcome {
    Extracted {
        url: String,
        final_url: String,
        records: Vec<BusinessRecord>,
    },
    FetchFailed {
        url: String,
        error: FetchError,
    },
    ParseFailed {
        url: String,
        error: ExtractError,
    },
}

impl PageOutcome {
    fn into_scrape_error(self) -> Result<Vec<BusinessRecord>, ScrapeError> {
        match self {
            PageOutcome::Extracted { records, .. } => Ok(records),
            PageOutcome::FetchFailed { url, error } => {
                Err(ScrapeError::new(url, error.to_string(), ScrapeStage::Fetch))
            }
            PageOutcome::ParseFailed { url, error } => {
                Err(ScrapeError::new(url, error.to_string(), ScrapeStage::Parse))
            }
        }
    }
}

/// Owns one [`Fetcher`] and runs batches of URLs through the pipeline.
pub struct Coordinator {
    settings: ScraperSettings,
    fetcher: Fetcher,
}

impl Coordinator {
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(settings: ScraperSettings) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&settings)?;
        Ok(Self { settings, fetcher })
    }

    /// Uses an existing fetcher, e.g. one with a fixed header seed.
    #[must_use]
    pub fn with_fetcher(settings: ScraperSettings, fetcher: Fetcher) -> Self {
        Self { settings, fetcher }
    }

    #[must_use]
    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Scrapes `urls` (capped at `request_max_urls`; extras are dropped) and
    /// returns every record, every per-URL error and run metadata. Per-URL
    /// failures never abort the batch.
    pub async fn scrape(&self, urls: &[String], max_concurrency: Option<usize>) -> ScrapeOutput {
        let started = Instant::now();
        let targets: Vec<String> = urls
            .iter()
            .take(self.settings.request_max_urls)
            .cloned()
            .collect();
        let total_requested = targets.len();

        let mut businesses = Vec::new();
        let mut errors = Vec::new();
        let mut fetch_failures = 0usize;

        let mut pages = self.fetcher.fetch_many(targets, max_concurrency);
        while let Some((url, result)) = pages.next().await {
            let outcome = match result {
                Ok(fetched) => self.process_page(url, fetched.final_url, &fetched.body),
                Err(error) => {
                    tracing::warn!(url, error = %error, "fetch failed");
                    fetch_failures += 1;
                    PageOutcome::FetchFailed { url, error }
                }
            };
            match outcome.into_scrape_error() {
                Ok(records) => businesses.extend(records),
                Err(err) => errors.push(err),
            }
        }

        let businesses = dedupe_records(businesses);
        let meta = ScrapeMeta {
            total_requested,
            total_succeeded: total_requested.saturating_sub(fetch_failures),
            total_businesses: businesses.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            requested = meta.total_requested,
            succeeded = meta.total_succeeded,
            businesses = meta.total_businesses,
            errors = errors.len(),
            duration_ms = meta.duration_ms,
            "scrape batch finished"
        );

        ScrapeOutput {
            businesses,
            errors,
            meta,
        }
    }

    /// Extraction for one fetched page. Runs synchronously; the parsed DOM
    /// never outlives this call.
    fn process_page(&self, url: String, final_url: String, body: &str) -> PageOutcome {
        let effective = if final_url.is_empty() {
            url.clone()
        } else {
            final_url
        };
        match extract_page(body, &effective, &self.settings) {
            Ok(candidates) => PageOutcome::Extracted {
                records: into_records(&effective, candidates),
                url,
                final_url: effective,
            },
            Err(error) => {
                tracing::warn!(url = %effective, error = %error, "extraction failed");
                PageOutcome::ParseFailed {
                    url: effective,
                    error,
                }
            }
        }
    }

    /// Shuts down the owned fetcher.
    pub fn close(self) {
        self.fetcher.close();
    }
}

/// Candidates that fail validation are logged and dropped.
fn into_records(page_url: &str, candidates: Vec<ExtractionCandidate>) -> Vec<BusinessRecord> {
    candidates
        .into_iter()
        .filter_map(|candidate| match candidate.into_record() {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(url = page_url, error = %err, "dropping invalid candidate");
                None
            }
        })
        .collect()
}

/// Keeps the first record per identity key. Structured records are seen
/// before heuristic ones; page and extraction order hold within each group.
fn dedupe_records(mut records: Vec<BusinessRecord>) -> Vec<BusinessRecord> {
    records.sort_by_key(|record| record.extraction_method.code());
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.identity_key()))
        .collect()
}
