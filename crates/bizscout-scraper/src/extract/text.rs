//! Text cleanup, price matching, hint checks and URL resolution shared by
//! both sub-extractors.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::ElementRef;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([£$€]|AUD|CAD|USD|EUR|GBP|SGD|AED)\s?\d[\d,. ]*").expect("valid regex")
});

static LOCATION_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(city|town|region|state|country|county|province|location)\b")
        .expect("valid regex")
});

static STATUS_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sold|available|under offer|completed)\b").expect("valid regex")
});

static BUSINESS_TYPE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(franchise|restaurant|cafe|retail|service|manufacturing|property|real estate|technology)\b",
    )
    .expect("valid regex")
});

/// Collapses whitespace runs to one space and trims. Empty becomes `None`.
#[must_use]
pub fn clean_text(value: &str) -> Option<String> {
    let cleaned = WHITESPACE_RE.replace_all(value, " ");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// [`clean_text`] over an optional value.
#[must_use]
pub fn clean_opt(value: Option<&str>) -> Option<String> {
    value.and_then(clean_text)
}

/// Concatenated text of an element, cleaned.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<String>())
}

/// Text of an element with a space between text nodes, cleaned.
#[must_use]
pub fn element_text_spaced(element: ElementRef<'_>) -> Option<String> {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// The first currency amount in `text`, if any.
#[must_use]
pub fn find_price(text: &str) -> Option<String> {
    PRICE_RE.find(text).and_then(|m| clean_text(m.as_str()))
}

/// The currency amount in `text` when one matches, otherwise the cleaned
/// text itself.
#[must_use]
pub fn normalize_price(text: &str) -> Option<String> {
    let cleaned = clean_text(text)?;
    Some(find_price(&cleaned).unwrap_or(cleaned))
}

/// Keeps `text` only when it reads like a place.
#[must_use]
pub fn guess_location(text: &str) -> Option<String> {
    clean_text(text).filter(|t| LOCATION_HINT_RE.is_match(t))
}

/// Keeps `text` only when it reads like a sale status.
#[must_use]
pub fn guess_status(text: &str) -> Option<String> {
    clean_text(text).filter(|t| STATUS_HINT_RE.is_match(t))
}

/// Keeps `text` only when it names a recognizable line of business.
#[must_use]
pub fn guess_business_type(text: &str) -> Option<String> {
    clean_text(text).filter(|t| BUSINESS_TYPE_HINT_RE.is_match(t))
}

/// Resolves `href` against `base`. Blank input yields `None`; an
/// unresolvable reference is kept as written.
#[must_use]
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let cleaned = clean_text(href)?;
    Some(
        base.join(&cleaned)
            .map_or(cleaned, |resolved| resolved.to_string()),
    )
}

/// Resolves each value against `base`, dropping blanks and repeats while
/// keeping first-seen order.
pub fn resolve_all<'a, I>(base: &Url, values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut resolved = Vec::new();
    for value in values {
        if let Some(url) = resolve_url(base, value) {
            push_unique(&mut resolved, url);
        }
    }
    resolved
}

pub fn push_unique(items: &mut Vec<String>, value: String) {
    if !items.contains(&value) {
        items.push(value);
    }
}
