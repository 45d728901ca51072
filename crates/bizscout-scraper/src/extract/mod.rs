//! Turns one page body into validated listing candidates.
//!
//! Structured metadata is read first, then DOM heuristics; both feed the
//! same [`CandidateFilter`], so a structured candidate wins over a heuristic
//! one for the same listing URL.

mod candidate;
mod filter;
mod heuristic;
mod markup;
mod structured;
pub mod text;

use bizscout_core::ScraperSettings;
use reqwest::Url;
use scraper::Html;

pub use candidate::ExtractionCandidate;
pub use filter::CandidateFilter;

use crate::error::ExtractError;

/// Extracts, filters and de-duplicates the candidates on one page.
///
/// `page_url` is the effective (post-redirect) URL of the page; relative
/// links resolve against it.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidPageUrl`] if `page_url` cannot be parsed.
pub fn extract_page(
    html: &str,
    page_url: &str,
    settings: &ScraperSettings,
) -> Result<Vec<ExtractionCandidate>, ExtractError> {
    let url = Url::parse(page_url).map_err(|e| ExtractError::InvalidPageUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(html);

    let structured = structured::extract(&document, &url);
    let heuristic = heuristic::extract(&document, &url);
    tracing::debug!(
        url = page_url,
        structured = structured.len(),
        heuristic = heuristic.len(),
        "extracted raw candidates"
    );

    let merged =
        CandidateFilter::new(settings, page_url).apply(structured.into_iter().chain(heuristic));
    tracing::debug!(url = page_url, merged = merged.len(), "filtered candidates");
    Ok(merged)
}
