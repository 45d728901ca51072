//! Candidates from embedded machine-readable metadata.

use std::collections::HashMap;

use bizscout_core::ExtractionMethod;
use reqwest::Url;
use scraper::Html;
use serde_json::Value;

use super::candidate::ExtractionCandidate;
use super::markup;
use super::text::{
    clean_text, find_price, guess_business_type, normalize_price, push_unique, resolve_url,
};

const BUSINESS_TYPES: [&str; 7] = [
    "LocalBusiness",
    "Business",
    "Product",
    "Offer",
    "Service",
    "Organization",
    "Corporation",
];

const NAME_KEYS: [&str; 4] = ["name", "headline", "title", "legalName"];

/// Structured candidates for one page: JSON-LD, then microdata, then RDFa,
/// then the OpenGraph fallback.
#[must_use]
pub fn extract(document: &Html, page_url: &Url) -> Vec<ExtractionCandidate> {
    let base = markup::base_url(document, page_url);

    let mut graph = markup::json_ld(document);
    graph.extend(markup::microdata(document, &base));
    graph.extend(markup::rdfa(document, &base));

    let mut nodes = Vec::new();
    for root in &graph {
        collect_business_nodes(root, &mut nodes);
    }

    let mut candidates: Vec<ExtractionCandidate> = nodes
        .into_iter()
        .filter_map(|node| from_node(node, &base))
        .collect();
    candidates.extend(from_opengraph(&markup::opengraph(document), &base));
    candidates
}

fn declared_types(node: &Value) -> Vec<&str> {
    match node.get("@type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn is_business(node: &Value) -> bool {
    declared_types(node)
        .iter()
        .any(|t| BUSINESS_TYPES.contains(&t.trim()))
}

/// Depth-first walk; a matching node is collected and its children are
/// still searched.
fn collect_business_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_business_nodes(item, out);
            }
        }
        Value::Object(map) => {
            if is_business(value) {
                out.push(value);
            }
            for child in map.values() {
                if child.is_object() || child.is_array() {
                    collect_business_nodes(child, out);
                }
            }
        }
        _ => {}
    }
}

/// Scalar text of a metadata value. Objects contribute their `name`, arrays
/// their first textual member.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("name").and_then(value_text),
        Value::Array(items) => items.iter().find_map(value_text),
        _ => None,
    }
}

fn field_text(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(value_text)
}

fn offer_price(node: &Value) -> Option<String> {
    let price_of = |offer: &Value| {
        field_text(offer, "price").or_else(|| field_text(offer, "priceCurrency"))
    };
    match node.get("offers")? {
        offer @ Value::Object(_) => price_of(offer),
        Value::Array(offers) => offers
            .iter()
            .filter(|offer| offer.is_object())
            .find_map(price_of),
        _ => None,
    }
}

fn location(node: &Value) -> Option<String> {
    let place = node.get("address").or_else(|| node.get("areaServed"))?;
    match place {
        Value::Object(_) => {
            let parts: Vec<String> = [
                "streetAddress",
                "addressLocality",
                "addressRegion",
                "addressCountry",
            ]
            .iter()
            .filter_map(|key| place.get(*key).and_then(value_text))
            .collect();
            clean_text(&parts.join(", "))
        }
        Value::String(s) => clean_text(s),
        _ => None,
    }
}

fn link_values(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(Value::as_str)
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(link_values).collect(),
        _ => Vec::new(),
    }
}

fn from_node(node: &Value, base: &Url) -> Option<ExtractionCandidate> {
    let title = NAME_KEYS.iter().find_map(|key| field_text(node, key))?;
    let raw_url = field_text(node, "url").or_else(|| field_text(node, "@id"))?;
    let listing_url = resolve_url(base, &raw_url)?;

    let description = field_text(node, "description");
    let price = offer_price(node)
        .and_then(|p| normalize_price(&p))
        .or_else(|| description.as_deref().and_then(find_price));

    let business_type = match node.get("@type") {
        Some(Value::String(t)) => guess_business_type(t),
        _ => None,
    };

    let mut images = Vec::new();
    for src in node.get("image").map(link_values).unwrap_or_default() {
        if let Some(url) = resolve_url(base, src) {
            push_unique(&mut images, url);
        }
    }

    let mut all_links = vec![listing_url.clone()];
    for href in node.get("sameAs").map(link_values).unwrap_or_default() {
        if let Some(url) = resolve_url(base, href) {
            push_unique(&mut all_links, url);
        }
    }

    Some(ExtractionCandidate {
        title: Some(title),
        listing_url: Some(listing_url),
        location: location(node),
        price,
        description,
        business_type,
        images,
        financial_info: field_text(node, "founder")
            .or_else(|| field_text(node, "foundingDate")),
        additional_details: field_text(node, "slogan"),
        all_links,
        ..ExtractionCandidate::new(ExtractionMethod::Structured)
    })
}

/// Page-level social preview tags. Low confidence; used when a page has a
/// title and URL but no business metadata.
fn from_opengraph(og: &HashMap<String, String>, base: &Url) -> Option<ExtractionCandidate> {
    let title = og.get("og:title").and_then(|t| clean_text(t))?;
    let listing_url = og.get("og:url").and_then(|u| resolve_url(base, u))?;

    let price = og
        .get("og:price:amount")
        .or_else(|| og.get("product:price:amount"))
        .and_then(|p| normalize_price(p));

    Some(ExtractionCandidate {
        title: Some(title),
        listing_url: Some(listing_url.clone()),
        price,
        description: og.get("og:description").and_then(|d| clean_text(d)),
        business_type: og.get("og:type").and_then(|t| guess_business_type(t)),
        images: og
            .get("og:image")
            .and_then(|src| resolve_url(base, src))
            .into_iter()
            .collect(),
        all_links: vec![listing_url],
        ..ExtractionCandidate::new(ExtractionMethod::Structured)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://listings.example.com/search").unwrap()
    }

    fn extract_html(html: &str) -> Vec<ExtractionCandidate> {
        extract(&Html::parse_document(html), &page())
    }

    #[test]
    fn json_ld_local_business_maps_all_fields() {
        let candidates = extract_html(
            r#"<script type="application/ld+json">{
                "@context": "https://schema.org",
                "@type": "LocalBusiness",
                "name": "Riverside Cafe",
                "url": "/listing/riverside-cafe",
                "description": "Busy riverside cafe with 40 covers and a loyal local following.",
                "offers": {"@type": "Offer", "price": "GBP 180,000"},
                "address": {
                    "streetAddress": "1 Quay Street",
                    "addressLocality": "Bristol",
                    "addressCountry": {"@type": "Country", "name": "UK"}
                },
                "image": ["/img/cafe.jpg", {"@type": "ImageObject", "url": "/img/cafe-2.jpg"}, "/img/cafe.jpg"],
                "sameAs": "https://social.example.org/riverside",
                "founder": {"@type": "Person", "name": "Ada Jones"},
                "slogan": "Coffee by the water"
            }</script>"#,
        );

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.title.as_deref(), Some("Riverside Cafe"));
        assert_eq!(
            c.listing_url.as_deref(),
            Some("https://listings.example.com/listing/riverside-cafe")
        );
        assert_eq!(c.price.as_deref(), Some("GBP 180,000"));
        assert_eq!(c.location.as_deref(), Some("1 Quay Street, Bristol, UK"));
        assert_eq!(c.images.len(), 2);
        assert_eq!(
            c.all_links,
            vec![
                "https://listings.example.com/listing/riverside-cafe",
                "https://social.example.org/riverside",
            ]
        );
        assert_eq!(c.financial_info.as_deref(), Some("Ada Jones"));
        assert_eq!(c.additional_details.as_deref(), Some("Coffee by the water"));
        assert_eq!(c.listing_index, None);
        assert_eq!(c.extraction_method, ExtractionMethod::Structured);
    }

    #[test]
    fn candidates_without_name_or_url_are_dropped() {
        let candidates = extract_html(
            r#"<script type="application/ld+json">[
                {"@type": "Organization", "name": "No Link Ltd"},
                {"@type": "Product", "url": "https://listings.example.com/p/1"},
                {"@type": "Person", "name": "Not A Business", "url": "https://x.example.com"}
            ]</script>"#,
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn graph_is_walked_recursively() {
        let candidates = extract_html(
            r#"<script type="application/ld+json">{
                "@context": "https://schema.org",
                "@graph": [
                    {"@type": "WebPage", "name": "Search"},
                    {"@type": ["Thing", "Corporation"], "legalName": "Acme Widgets Plc", "@id": "https://listings.example.com/c/acme"}
                ]
            }</script>"#,
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title.as_deref(), Some("Acme Widgets Plc"));
    }

    #[test]
    fn price_falls_back_to_description() {
        let candidates = extract_html(
            r#"<script type="application/ld+json">{
                "@type": "Business", "name": "Corner Shop", "url": "https://listings.example.com/s/7",
                "description": "Freehold corner shop offered at $95,000 including stock."
            }</script>"#,
        );
        assert_eq!(candidates[0].price.as_deref(), Some("$95,000"));
    }

    #[test]
    fn offer_list_uses_first_priced_offer() {
        let candidates = extract_html(
            r#"<script type="application/ld+json">{
                "@type": "Service", "name": "Mobile Valeting Round", "url": "https://listings.example.com/s/8",
                "offers": [{"@type": "Offer"}, {"@type": "Offer", "price": 42000, "priceCurrency": "USD"}]
            }</script>"#,
        );
        assert_eq!(candidates[0].price.as_deref(), Some("42000"));
        assert_eq!(candidates[0].business_type.as_deref(), Some("Service"));
    }

    #[test]
    fn opengraph_fallback_comes_last() {
        let candidates = extract_html(
            r#"<html><head>
                 <meta property="og:title" content="Lakeside Holiday Park">
                 <meta property="og:url" content="/parks/lakeside">
                 <meta property="og:image" content="/img/park.jpg">
                 <meta property="product:price:amount" content="€2,400,000">
               </head><body>
                 <div itemscope itemtype="https://schema.org/Organization">
                   <span itemprop="name">Hilltop Builders</span>
                   <a itemprop="url" href="/b/hilltop">More</a>
                 </div>
               </body></html>"#,
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title.as_deref(), Some("Hilltop Builders"));
        let og = &candidates[1];
        assert_eq!(og.title.as_deref(), Some("Lakeside Holiday Park"));
        assert_eq!(
            og.listing_url.as_deref(),
            Some("https://listings.example.com/parks/lakeside")
        );
        assert_eq!(og.price.as_deref(), Some("€2,400,000"));
        assert_eq!(og.images, vec!["https://listings.example.com/img/park.jpg"]);
    }

    #[test]
    fn opengraph_without_url_is_ignored() {
        let candidates = extract_html(
            r#"<head><meta property="og:title" content="Just A Title"></head>"#,
        );
        assert!(candidates.is_empty());
    }
}
