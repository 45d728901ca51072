//! Database operations for the `scrape_runs` table.

use bizscout_core::ScrapeError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{to_i32, DbError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Counters and errors for one ingest pass, as written to `scrape_runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_urls: usize,
    pub scraped_count: usize,
    pub unique_count: usize,
    pub persisted_count: usize,
    /// In-run duplicates plus records already stored.
    pub duplicate_count: usize,
    pub error_count: usize,
    pub errors: Vec<ScrapeError>,
    pub notes: Option<String>,
}

impl ScrapeRunSummary {
    /// A summary with every counter at zero, spanning `started_at..finished_at`.
    #[must_use]
    pub fn empty(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
            total_urls: 0,
            scraped_count: 0,
            unique_count: 0,
            persisted_count: 0,
            duplicate_count: 0,
            error_count: 0,
            errors: Vec::new(),
            notes: None,
        }
    }
}

/// Milliseconds between two instants; negative spans clamp to zero.
#[must_use]
pub fn elapsed_ms(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> u64 {
    u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or(0)
}

/// A row from the `scrape_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub total_urls: i32,
    pub scraped_count: i32,
    pub unique_count: i32,
    pub persisted_count: i32,
    pub duplicate_count: i32,
    pub error_count: i32,
    pub error_details: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, started_at, finished_at, duration_ms, total_urls, \
     scraped_count, unique_count, persisted_count, duplicate_count, error_count, \
     error_details, notes, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Writes `summary` as a new run row. An empty error list is stored as
/// `NULL` rather than `[]`.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if the errors cannot be serialized, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn record_scrape_run(
    pool: &PgPool,
    summary: &ScrapeRunSummary,
) -> Result<ScrapeRunRow, DbError> {
    let error_details = if summary.errors.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&summary.errors)?)
    };

    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "INSERT INTO scrape_runs (started_at, finished_at, duration_ms, total_urls, \
             scraped_count, unique_count, persisted_count, duplicate_count, error_count, \
             error_details, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(summary.started_at)
    .bind(summary.finished_at)
    .bind(i64::try_from(summary.duration_ms).unwrap_or(i64::MAX))
    .bind(to_i32(summary.total_urls))
    .bind(to_i32(summary.scraped_count))
    .bind(to_i32(summary.unique_count))
    .bind(to_i32(summary.persisted_count))
    .bind(to_i32(summary.duplicate_count))
    .bind(to_i32(summary.error_count))
    .bind(error_details)
    .bind(summary.notes.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns up to `limit` runs, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_scrape_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ScrapeRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
