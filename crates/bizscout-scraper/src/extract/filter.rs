//! Shared validation applied to every candidate regardless of source.

use std::collections::HashSet;

use bizscout_core::ScraperSettings;

use super::candidate::ExtractionCandidate;
use super::text::{clean_opt, clean_text};

/// Page-scoped filter built from the configured thresholds and blocklists.
pub struct CandidateFilter<'a> {
    settings: &'a ScraperSettings,
    junk_titles: Vec<String>,
    junk_urls: Vec<String>,
    page_key: String,
}

fn without_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

impl<'a> CandidateFilter<'a> {
    #[must_use]
    pub fn new(settings: &'a ScraperSettings, page_url: &str) -> Self {
        let lowered = |keywords: &[String]| -> Vec<String> {
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            settings,
            junk_titles: lowered(&settings.junk_title_keywords),
            junk_urls: lowered(&settings.junk_url_keywords),
            page_key: without_trailing_slash(page_url.trim()).to_lowercase(),
        }
    }

    /// Normalizes, validates and de-duplicates `candidates`, keeping the
    /// first occurrence of each case-folded listing URL.
    pub fn apply<I>(&self, candidates: I) -> Vec<ExtractionCandidate>
    where
        I: IntoIterator<Item = ExtractionCandidate>,
    {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .map(normalize)
            .filter(|c| self.accepts(c))
            .filter(|c| {
                c.listing_url
                    .as_deref()
                    .is_some_and(|url| seen.insert(url.to_lowercase()))
            })
            .collect()
    }

    #[must_use]
    pub fn accepts(&self, candidate: &ExtractionCandidate) -> bool {
        self.title_ok(candidate) && self.url_ok(candidate) && self.has_rich_content(candidate)
    }

    fn title_ok(&self, candidate: &ExtractionCandidate) -> bool {
        let Some(title) = candidate.title.as_deref() else {
            return false;
        };
        if title.split_whitespace().count() < self.settings.min_listing_title_words {
            return false;
        }
        let lowered = title.to_lowercase();
        !self.junk_titles.iter().any(|kw| lowered.contains(kw.as_str()))
    }

    fn url_ok(&self, candidate: &ExtractionCandidate) -> bool {
        let Some(url) = candidate.listing_url.as_deref() else {
            return false;
        };
        let lowered = url.to_lowercase();
        if self.junk_urls.iter().any(|kw| lowered.contains(kw.as_str())) {
            return false;
        }
        without_trailing_slash(&lowered) != self.page_key
    }

    fn has_rich_content(&self, candidate: &ExtractionCandidate) -> bool {
        let s = self.settings;
        let long_enough =
            |text: Option<&str>, min: usize| text.is_some_and(|t| t.chars().count() >= min);
        long_enough(candidate.description.as_deref(), s.min_listing_text_length)
            || candidate.price.is_some()
            || candidate.financial_info.is_some()
            || long_enough(candidate.features.as_deref(), s.min_listing_feature_length)
            || long_enough(candidate.raw_text.as_deref(), s.min_listing_text_length)
            || !candidate.images.is_empty()
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values.iter().filter_map(|v| clean_text(v)) {
        if !cleaned.contains(&value) {
            cleaned.push(value);
        }
    }
    cleaned
}

/// Collapses whitespace in every text field; blanks become `None`.
/// `raw_html` is left untouched.
fn normalize(candidate: ExtractionCandidate) -> ExtractionCandidate {
    ExtractionCandidate {
        title: clean_opt(candidate.title.as_deref()),
        listing_url: clean_opt(candidate.listing_url.as_deref()),
        location: clean_opt(candidate.location.as_deref()),
        price: clean_opt(candidate.price.as_deref()),
        description: clean_opt(candidate.description.as_deref()),
        business_type: clean_opt(candidate.business_type.as_deref()),
        status: clean_opt(candidate.status.as_deref()),
        contact_info: clean_opt(candidate.contact_info.as_deref()),
        financial_info: clean_opt(candidate.financial_info.as_deref()),
        features: clean_opt(candidate.features.as_deref()),
        additional_details: clean_opt(candidate.additional_details.as_deref()),
        raw_text: clean_opt(candidate.raw_text.as_deref()),
        images: clean_list(candidate.images),
        all_links: clean_list(candidate.all_links),
        ..candidate
    }
}
