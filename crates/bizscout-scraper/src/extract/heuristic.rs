//! Candidates from repeated DOM containers.
//!
//! Listing pages tend to render each result in a container sharing one set
//! of CSS classes. Containers are grouped by their class signature, the
//! most listing-like group is chosen, and each member is read field by
//! field.

use std::collections::HashMap;
use std::sync::LazyLock;

use bizscout_core::ExtractionMethod;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::candidate::ExtractionCandidate;
use super::text::{
    clean_text, element_text, element_text_spaced, find_price, guess_business_type,
    guess_location, guess_status, resolve_all, resolve_url,
};

const LISTING_CLASS_HINTS: [&str; 10] = [
    "listing",
    "result",
    "card",
    "item",
    "search-result",
    "business",
    "opportunity",
    "teaser",
    "entry",
    "record",
];

/// Smallest group accepted as a listing cluster.
const MIN_CLUSTER_SIZE: usize = 3;
const MIN_TITLE_WORDS: usize = 2;

const LOCATION_CLASSES: [&str; 4] = ["location", "city", "county", "region"];
const STATUS_CLASSES: [&str; 3] = ["status", "state", "deal"];
const TYPE_CLASSES: [&str; 3] = ["type", "category", "sector"];
const FINANCIAL_CLASSES: [&str; 3] = ["turnover", "revenue", "profit"];
const DETAIL_CLASSES: [&str; 3] = ["detail", "summary", "highlight"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("div, section, article, li"));
static FALLBACK_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("article, div[class], li[class]"));
static TITLE_SELS: LazyLock<[Selector; 5]> = LazyLock::new(|| {
    [
        selector("h1"),
        selector("h2"),
        selector("h3"),
        selector("h4"),
        selector("a"),
    ]
});
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img[src]"));
static TEXT_BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p, div, span"));
static LI_SEL: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static ANY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("*"));

/// Heuristic candidates for one page.
#[must_use]
pub fn extract(document: &Html, page_url: &Url) -> Vec<ExtractionCandidate> {
    let Some(body) = document.select(&BODY_SEL).next() else {
        return Vec::new();
    };

    let mut containers = listing_cluster(body);
    if containers.is_empty() {
        containers = body.select(&FALLBACK_SEL).collect();
    }

    let candidates: Vec<ExtractionCandidate> = containers
        .into_iter()
        .enumerate()
        .filter_map(|(index, container)| from_container(container, page_url, index))
        .collect();

    if candidates.is_empty() {
        return from_container(body, page_url, 0).into_iter().collect();
    }
    candidates
}

/// Sorted, de-duplicated class tokens joined by a space.
fn class_signature(class: &str) -> String {
    let mut tokens: Vec<&str> = class.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}

fn has_listing_hint(signature: &str) -> bool {
    let lowered = signature.to_lowercase();
    LISTING_CLASS_HINTS.iter().any(|hint| lowered.contains(hint))
}

/// Members of the highest-ranked class group with at least
/// [`MIN_CLUSTER_SIZE`] members, in document order. Empty when no group
/// qualifies.
fn listing_cluster(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut groups: Vec<(String, Vec<ElementRef<'_>>)> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for element in root.select(&CONTAINER_SEL) {
        let Some(class) = element.value().attr("class") else {
            continue;
        };
        let signature = class_signature(class);
        if signature.is_empty() || element.select(&LINK_SEL).next().is_none() {
            continue;
        }
        match index_of.get(&signature) {
            Some(&i) => groups[i].1.push(element),
            None => {
                index_of.insert(signature.clone(), groups.len());
                groups.push((signature, vec![element]));
            }
        }
    }

    // Stable sort keeps first-appearance order among equal ranks.
    groups.sort_by_key(|(signature, members)| {
        (!has_listing_hint(signature), std::cmp::Reverse(members.len()))
    });

    groups
        .into_iter()
        .find(|(_, members)| members.len() >= MIN_CLUSTER_SIZE)
        .map(|(_, members)| members)
        .unwrap_or_default()
}

/// Text of the first descendant whose class contains any of `keywords`.
fn text_by_class_keyword(container: ElementRef<'_>, keywords: &[&str]) -> Option<String> {
    container
        .select(&ANY_SEL)
        .find(|el| {
            el.value().attr("class").is_some_and(|class| {
                let class = class.to_lowercase();
                keywords.iter().any(|kw| class.contains(kw))
            })
        })
        .and_then(element_text)
}

/// Longest by character count; the earlier block wins ties.
fn longest_text(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&TEXT_BLOCK_SEL)
        .filter_map(element_text)
        .map(|text| (text.chars().count(), text))
        .fold(None, |longest: Option<(usize, String)>, (len, text)| match longest {
            Some(current) if current.0 >= len => Some(current),
            _ => Some((len, text)),
        })
        .map(|(_, text)| text)
}

fn price_hint(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&TEXT_BLOCK_SEL)
        .filter_map(element_text)
        .filter(|text| text.contains(['£', '€', '$']))
        .find_map(|text| find_price(&text))
}

fn from_container(
    container: ElementRef<'_>,
    page_url: &Url,
    index: usize,
) -> Option<ExtractionCandidate> {
    let title_el = TITLE_SELS
        .iter()
        .find_map(|sel| container.select(sel).next())?;
    let title = element_text(title_el)?;
    if title.split_whitespace().count() < MIN_TITLE_WORDS {
        return None;
    }

    let link_el = if title_el.value().name() == "a" && title_el.value().attr("href").is_some() {
        Some(title_el)
    } else {
        container.select(&LINK_SEL).next()
    };
    let listing_url = link_el
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(page_url, href))
        .unwrap_or_else(|| format!("{page_url}#listing-{index}"));

    let description = longest_text(container);
    let price = description
        .as_deref()
        .and_then(find_price)
        .or_else(|| price_hint(container));

    let location = text_by_class_keyword(container, &LOCATION_CLASSES)
        .map(|raw| guess_location(&raw).unwrap_or(raw));
    let status = text_by_class_keyword(container, &STATUS_CLASSES).and_then(|t| guess_status(&t));
    let business_type =
        text_by_class_keyword(container, &TYPE_CLASSES).and_then(|t| guess_business_type(&t));

    let images = resolve_all(
        page_url,
        container
            .select(&IMG_SEL)
            .filter_map(|img| img.value().attr("src")),
    );
    let all_links = resolve_all(
        page_url,
        container
            .select(&LINK_SEL)
            .filter_map(|a| a.value().attr("href")),
    );

    let features: Vec<String> = container
        .select(&LI_SEL)
        .filter_map(element_text_spaced)
        .collect();

    Some(ExtractionCandidate {
        title: Some(title),
        listing_url: Some(listing_url),
        location,
        price,
        description,
        business_type,
        status,
        images,
        financial_info: text_by_class_keyword(container, &FINANCIAL_CLASSES),
        features: clean_text(&features.join(" | ")),
        additional_details: text_by_class_keyword(container, &DETAIL_CLASSES),
        all_links,
        raw_text: element_text_spaced(container),
        raw_html: Some(container.html()),
        listing_index: Some(index),
        ..ExtractionCandidate::new(ExtractionMethod::Heuristic)
    })
}

#[cfg(test)]
#[path = "heuristic_test.rs"]
mod tests;
