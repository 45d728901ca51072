use std::collections::HashSet;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use bizscout_core::ScrapeOutput;
use reqwest::Url;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// Upper bound for a caller-supplied concurrency override.
pub(super) const MAX_CONCURRENCY_OVERRIDE: i64 = 32;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScrapeRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub max_concurrency: Option<i64>,
}

/// A request that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct ValidScrape {
    pub urls: Vec<String>,
    pub max_concurrency: Option<usize>,
}

/// Trims URLs, drops blanks, collapses case-insensitive duplicates (first
/// wins) and checks limits.
pub(super) fn validate_request(
    request: ScrapeRequest,
    max_urls: usize,
) -> Result<ValidScrape, String> {
    let max_concurrency = match request.max_concurrency {
        None => None,
        Some(n @ 1..=MAX_CONCURRENCY_OVERRIDE) => usize::try_from(n).ok(),
        Some(n) => {
            return Err(format!(
                "maxConcurrency must be between 1 and {MAX_CONCURRENCY_OVERRIDE}, got {n}"
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(request.urls.len());
    for raw in &request.urls {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let has_host = Url::parse(value).is_ok_and(|u| u.has_host());
        if !has_host {
            return Err(format!("each URL must include a scheme and host: {value}"));
        }
        if seen.insert(value.to_lowercase()) {
            urls.push(value.to_string());
        }
    }

    if urls.is_empty() {
        return Err("at least one valid URL is required".to_string());
    }
    if urls.len() > max_urls {
        return Err(format!("too many URLs; maximum is {max_urls}"));
    }

    Ok(ValidScrape {
        urls,
        max_concurrency,
    })
}

pub(super) async fn scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeOutput>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;

    let max_urls = state.coordinator.settings().request_max_urls;
    let valid = validate_request(request, max_urls)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    tracing::info!(
        request_id = %req_id.0,
        urls = valid.urls.len(),
        max_concurrency = ?valid.max_concurrency,
        "scrape request accepted"
    );
    let output = state
        .coordinator
        .scrape(&valid.urls, valid.max_concurrency)
        .await;
    Ok(Json(output))
}
