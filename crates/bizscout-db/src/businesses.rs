//! Database operations for the `businesses` table.

use std::collections::HashSet;

use bizscout_core::BusinessRecord;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `businesses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: i64,
    pub public_id: Uuid,
    pub title: String,
    pub listing_url: String,
    pub location: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub business_type: Option<String>,
    pub status: Option<String>,
    pub images: Json<Vec<String>>,
    pub contact_info: Option<String>,
    pub financial_info: Option<String>,
    pub features: Option<String>,
    pub additional_details: Option<String>,
    pub all_links: Json<Vec<String>>,
    pub listing_index: Option<i32>,
    pub extraction_method: i16,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one [`save_businesses`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistResult {
    pub persisted: usize,
    /// Records skipped because their listing URL was already stored, either
    /// before the call or earlier in the same batch.
    pub duplicates_in_db: usize,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts every record whose listing URL is not yet stored. Runs in one
/// transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is persisted
/// in that case.
pub async fn save_businesses(
    pool: &PgPool,
    records: &[BusinessRecord],
) -> Result<PersistResult, DbError> {
    if records.is_empty() {
        return Ok(PersistResult::default());
    }

    let urls: Vec<String> = records
        .iter()
        .map(|r| r.listing_url.clone())
        .filter(|u| !u.is_empty())
        .collect();

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, String>(
        "SELECT listing_url FROM businesses WHERE listing_url = ANY($1)",
    )
    .bind(&urls)
    .fetch_all(&mut *tx)
    .await?;
    let mut seen: HashSet<String> = existing.into_iter().collect();

    let mut result = PersistResult::default();
    for record in records {
        if !seen.insert(record.listing_url.clone()) {
            result.duplicates_in_db += 1;
            continue;
        }

        let inserted = sqlx::query(
            "INSERT INTO businesses (title, listing_url, location, price, description, \
                 business_type, status, images, contact_info, financial_info, features, \
                 additional_details, all_links, listing_index, extraction_method, \
                 modified_at, modified_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (listing_url) DO NOTHING",
        )
        .bind(&record.title)
        .bind(&record.listing_url)
        .bind(record.location.as_deref())
        .bind(record.price.as_deref())
        .bind(record.description.as_deref())
        .bind(record.business_type.as_deref())
        .bind(record.status.as_deref())
        .bind(Json(&record.images))
        .bind(record.contact_info.as_deref())
        .bind(record.financial_info.as_deref())
        .bind(record.features.as_deref())
        .bind(record.additional_details.as_deref())
        .bind(Json(&record.all_links))
        .bind(record.listing_index.and_then(|i| i32::try_from(i).ok()))
        .bind(i16::from(record.extraction_method.code()))
        .bind(record.modified_at)
        .bind(record.modified_by.as_deref())
        .execute(&mut *tx)
        .await?;

        // A concurrent writer may have stored the URL since the lookup.
        if inserted.rows_affected() == 0 {
            result.duplicates_in_db += 1;
        } else {
            result.persisted += 1;
        }
    }

    tx.commit().await?;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the most recently stored businesses, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_businesses(pool: &PgPool, limit: i64) -> Result<Vec<BusinessRow>, DbError> {
    let rows = sqlx::query_as::<_, BusinessRow>(
        "SELECT id, public_id, title, listing_url, location, price, description, business_type, \
                status, images, contact_info, financial_info, features, additional_details, \
                all_links, listing_index, extraction_method, modified_at, modified_by, created_at \
         FROM businesses \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
