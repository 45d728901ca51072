//! Commands that need the database: site management, stored businesses and
//! maintenance. Each fails fast when `SCRAPER_DATABASE_URL` is unset.

use anyhow::Context;
use bizscout_core::AppConfig;
use bizscout_db::{BusinessRow, SiteRow};
use reqwest::Url;
use sqlx::PgPool;

async fn connect(config: &AppConfig, feature: &'static str) -> anyhow::Result<PgPool> {
    config.require_database_url(feature)?;
    bizscout_db::connect_pool_from_config(config)
        .await
        .context("failed to connect to the database")
}

pub(crate) async fn run_list_sites(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config, "site listing").await?;
    let sites = bizscout_db::list_active_sites(&pool).await?;
    if sites.is_empty() {
        println!("no active scraping sites");
        return Ok(());
    }
    for site in &sites {
        println!("{}", format_site(site));
    }
    Ok(())
}

pub(crate) async fn run_add_site(config: &AppConfig, url: &str) -> anyhow::Result<()> {
    let url = validate_site_url(url)?;
    let pool = connect(config, "site registration").await?;
    let site = bizscout_db::add_site(&pool, &url).await?;
    tracing::info!(site_id = site.id, url = %site.url, "site registered");
    println!("{}", format_site(&site));
    Ok(())
}

pub(crate) async fn run_list_businesses(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let pool = connect(config, "business listing").await?;
    let rows = bizscout_db::list_businesses(&pool, limit.clamp(1, 500)).await?;
    if rows.is_empty() {
        println!("no stored businesses");
    }
    for row in &rows {
        println!("{}", format_business(row));
    }
    Ok(())
}

pub(crate) async fn run_db_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config, "database ping").await?;
    bizscout_db::health_check(&pool).await?;
    println!("database: ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config, "database migration").await?;
    let applied = bizscout_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Accepts only absolute `http`/`https` URLs; returns the trimmed value.
fn validate_site_url(raw: &str) -> anyhow::Result<String> {
    let value = raw.trim();
    let url = Url::parse(value).with_context(|| format!("invalid site URL: {value}"))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        anyhow::bail!("site URL must be an absolute http(s) URL with a host: {value}");
    }
    Ok(value.to_string())
}

fn format_site(site: &SiteRow) -> String {
    let last = site
        .last_scraped
        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
    format!("{}\t{}\tlast scraped: {last}", site.id, site.url)
}

fn format_business(row: &BusinessRow) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        row.title,
        row.price.as_deref().unwrap_or("-"),
        row.location.as_deref().unwrap_or("-"),
        row.listing_url
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sqlx::types::Json;

    use super::*;

    fn site(last_scraped: Option<chrono::DateTime<Utc>>) -> SiteRow {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        SiteRow {
            id: 4,
            public_id: Default::default(),
            url: "https://listings.example.com/search".to_string(),
            is_active: true,
            last_scraped,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn site_lines_show_last_scrape() {
        assert_eq!(
            format_site(&site(None)),
            "4\thttps://listings.example.com/search\tlast scraped: never"
        );
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 6, 30, 0).unwrap();
        assert!(format_site(&site(Some(at))).ends_with("last scraped: 2024-05-02T06:30:00+00:00"));
    }

    #[test]
    fn business_lines_fill_missing_fields() {
        let row = BusinessRow {
            id: 1,
            public_id: Default::default(),
            title: "Riverside Cafe".to_string(),
            listing_url: "https://listings.example.com/l/1".to_string(),
            location: None,
            price: Some("£180,000".to_string()),
            description: None,
            business_type: None,
            status: None,
            images: Json(Vec::new()),
            contact_info: None,
            financial_info: None,
            features: None,
            additional_details: None,
            all_links: Json(Vec::new()),
            listing_index: None,
            extraction_method: 1,
            modified_at: None,
            modified_by: None,
            created_at: Utc::now(),
        };
        assert_eq!(
            format_business(&row),
            "Riverside Cafe\t£180,000\t-\thttps://listings.example.com/l/1"
        );
    }

    #[test]
    fn site_urls_need_http_scheme_and_host() {
        assert_eq!(
            validate_site_url(" https://listings.example.com/search ").unwrap(),
            "https://listings.example.com/search"
        );
        assert!(validate_site_url("listings.example.com").is_err());
        assert!(validate_site_url("ftp://listings.example.com").is_err());
        assert!(validate_site_url("https://").is_err());
    }
}
