//! Database operations for the `scraping_sites` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `scraping_sites` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteRow {
    pub id: i64,
    pub public_id: Uuid,
    pub url: String,
    pub is_active: bool,
    pub last_scraped: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every active site, least recently scraped first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_sites(pool: &PgPool) -> Result<Vec<SiteRow>, DbError> {
    let rows = sqlx::query_as::<_, SiteRow>(
        "SELECT id, public_id, url, is_active, last_scraped, created_at, updated_at \
         FROM scraping_sites \
         WHERE is_active = true \
         ORDER BY last_scraped ASC NULLS FIRST, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Registers `url` as an active scraping site. Re-adding a known URL
/// reactivates it and returns the existing row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_site(pool: &PgPool, url: &str) -> Result<SiteRow, DbError> {
    let row = sqlx::query_as::<_, SiteRow>(
        "INSERT INTO scraping_sites (url) VALUES ($1) \
         ON CONFLICT (url) DO UPDATE SET is_active = true, updated_at = NOW() \
         RETURNING id, public_id, url, is_active, last_scraped, created_at, updated_at",
    )
    .bind(url.trim())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Stamps `last_scraped` (and `updated_at`) on the given sites. Returns the
/// number of rows touched; an empty `site_ids` is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_sites_last_scraped(
    pool: &PgPool,
    site_ids: &[i64],
    timestamp: DateTime<Utc>,
) -> Result<u64, DbError> {
    if site_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE scraping_sites SET last_scraped = $2, updated_at = $2 WHERE id = ANY($1)",
    )
    .bind(site_ids)
    .bind(timestamp)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
