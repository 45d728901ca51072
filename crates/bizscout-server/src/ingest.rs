//! One ingest pass: scrape every active site, de-duplicate across the run,
//! persist new listings and record a run summary.

use std::collections::HashSet;
use std::sync::Arc;

use bizscout_core::{BusinessRecord, ScrapeError, ScrapeStage};
use bizscout_db::{
    list_active_sites, record_scrape_run, save_businesses, scrape_runs::elapsed_ms,
    update_sites_last_scraped, DbError, ScrapeRunSummary, SiteRow,
};
use bizscout_scraper::Coordinator;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Mutex;

pub const NO_ACTIVE_SITES: &str = "No active scraping sites";

/// Runs ingest passes against one pool with the shared coordinator. Passes
/// never overlap.
pub struct Ingestor {
    pool: PgPool,
    coordinator: Arc<Coordinator>,
    running: Mutex<()>,
}

/// Everything gathered from the per-site scrapes of one pass.
#[derive(Debug, Default)]
struct SiteHarvest {
    records: Vec<BusinessRecord>,
    errors: Vec<ScrapeError>,
    attempted: Vec<i64>,
}

impl Ingestor {
    #[must_use]
    pub fn new(pool: PgPool, coordinator: Arc<Coordinator>) -> Self {
        Self {
            pool,
            coordinator,
            running: Mutex::new(()),
        }
    }

    /// Runs one pass, waiting for any pass already in progress to finish.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if loading sites, persisting records or writing
    /// the run summary fails. Per-site scrape failures are recorded in the
    /// summary instead.
    pub async fn run_once(&self) -> Result<ScrapeRunSummary, DbError> {
        let _guard = self.running.lock().await;
        self.execute().await
    }

    /// Scheduled entry point: skips the tick when a pass is still running
    /// and logs rather than returns failures.
    pub async fn run_scheduled(&self) {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::info!("ingest: previous pass still running; skipping tick");
            return;
        };
        if let Err(e) = self.execute().await {
            tracing::error!(error = %e, "ingest: scheduled pass failed");
        }
    }

    async fn execute(&self) -> Result<ScrapeRunSummary, DbError> {
        let started_at = Utc::now();
        tracing::info!(%started_at, "ingest: pass started");

        let sites = list_active_sites(&self.pool).await?;
        if sites.is_empty() {
            let mut summary = ScrapeRunSummary::empty(started_at, Utc::now());
            summary.notes = Some(NO_ACTIVE_SITES.to_string());
            record_scrape_run(&self.pool, &summary).await?;
            tracing::info!("ingest: no active scraping sites");
            return Ok(summary);
        }

        let harvest = self.scrape_sites(&sites).await;
        let scraped_count = harvest.records.len();
        let (unique, duplicates_in_run) = dedupe_run(harvest.records);
        let persisted = save_businesses(&self.pool, &unique).await?;

        let finished_at = Utc::now();
        let summary = ScrapeRunSummary {
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
            total_urls: sites.len(),
            scraped_count,
            unique_count: unique.len(),
            persisted_count: persisted.persisted,
            duplicate_count: duplicates_in_run + persisted.duplicates_in_db,
            error_count: harvest.errors.len(),
            errors: harvest.errors,
            notes: None,
        };

        record_scrape_run(&self.pool, &summary).await?;
        update_sites_last_scraped(&self.pool, &harvest.attempted, finished_at).await?;

        tracing::info!(
            total_urls = summary.total_urls,
            scraped = summary.scraped_count,
            unique = summary.unique_count,
            persisted = summary.persisted_count,
            duplicates = summary.duplicate_count,
            errors = summary.error_count,
            duration_ms = summary.duration_ms,
            "ingest: pass finished"
        );
        Ok(summary)
    }

    /// Scrapes each site in its own task. A task that dies becomes a
    /// `general`-stage error for that site.
    async fn scrape_sites(&self, sites: &[SiteRow]) -> SiteHarvest {
        let tasks: Vec<_> = sites
            .iter()
            .map(|site| {
                let coordinator = Arc::clone(&self.coordinator);
                let urls = vec![site.url.clone()];
                let handle = tokio::spawn(async move { coordinator.scrape(&urls, None).await });
                (site.id, site.url.clone(), handle)
            })
            .collect();

        let mut harvest = SiteHarvest::default();
        for (site_id, site_url, handle) in tasks {
            harvest.attempted.push(site_id);
            match handle.await {
                Ok(output) => {
                    harvest.records.extend(output.businesses);
                    harvest.errors.extend(output.errors);
                }
                Err(e) => {
                    tracing::warn!(
                        site_id,
                        site_url = %site_url,
                        error = %e,
                        "ingest: site scrape failed"
                    );
                    harvest
                        .errors
                        .push(ScrapeError::new(site_url, e.to_string(), ScrapeStage::General));
                }
            }
        }
        harvest
    }
}

/// Run-level identity: case-folded listing URL, else case-folded
/// `title|location`.
fn run_key(record: &BusinessRecord) -> String {
    let url = record.listing_url.trim();
    if !url.is_empty() {
        return url.to_lowercase();
    }
    match record.location.as_deref() {
        Some(location) => format!("{}|{}", record.title, location).to_lowercase(),
        None => record.title.to_lowercase(),
    }
}

/// Keeps the first record per [`run_key`]; returns the kept records and the
/// number dropped.
fn dedupe_run(records: Vec<BusinessRecord>) -> (Vec<BusinessRecord>, usize) {
    let total = records.len();
    let mut seen = HashSet::new();
    let unique: Vec<BusinessRecord> = records
        .into_iter()
        .filter(|record| seen.insert(run_key(record)))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}
