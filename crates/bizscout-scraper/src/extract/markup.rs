//! Reads embedded metadata out of a parsed document: JSON-LD blocks,
//! microdata and RDFa-lite items (as JSON-LD-shaped objects), and
//! OpenGraph `<meta>` properties.

use std::collections::HashMap;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use super::text::{clean_text, element_text, resolve_url};

static BASE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("valid selector"));
static SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type]").expect("valid selector"));
static ITEMSCOPE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope]").expect("valid selector"));
static TYPEOF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[typeof]").expect("valid selector"));
static META_PROPERTY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property][content]").expect("valid selector"));

/// Effective base for relative references: the first `<base href>`
/// resolved against the page URL, else the page URL.
#[must_use]
pub fn base_url(document: &Html, page_url: &Url) -> Url {
    document
        .select(&BASE_SEL)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Every parseable JSON-LD block, in document order. Broken blocks are
/// skipped.
#[must_use]
pub fn json_ld(document: &Html) -> Vec<Value> {
    document
        .select(&SCRIPT_SEL)
        .filter(|script| {
            script
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .filter_map(|script| {
            let raw: String = script.text().collect();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unparseable JSON-LD block");
                    None
                }
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Syntax {
    Microdata,
    Rdfa,
}

impl Syntax {
    fn scope_attr(self) -> &'static str {
        match self {
            Syntax::Microdata => "itemscope",
            Syntax::Rdfa => "typeof",
        }
    }

    fn type_attr(self) -> &'static str {
        match self {
            Syntax::Microdata => "itemtype",
            Syntax::Rdfa => "typeof",
        }
    }

    fn prop_attr(self) -> &'static str {
        match self {
            Syntax::Microdata => "itemprop",
            Syntax::Rdfa => "property",
        }
    }

    fn is_scope(self, element: ElementRef<'_>) -> bool {
        element.value().attr(self.scope_attr()).is_some()
    }
}

/// Top-level microdata items.
#[must_use]
pub fn microdata(document: &Html, base: &Url) -> Vec<Value> {
    top_level_items(document, &ITEMSCOPE_SEL, Syntax::Microdata, base)
}

/// Top-level RDFa-lite items.
#[must_use]
pub fn rdfa(document: &Html, base: &Url) -> Vec<Value> {
    top_level_items(document, &TYPEOF_SEL, Syntax::Rdfa, base)
}

/// Nested item scopes deeper than this are dropped.
const MAX_SCOPE_DEPTH: usize = 32;

fn top_level_items(document: &Html, selector: &Selector, syntax: Syntax, base: &Url) -> Vec<Value> {
    document
        .select(selector)
        .filter(|element| element.value().attr(syntax.prop_attr()).is_none())
        .map(|element| item(element, syntax, base, 0))
        .collect()
}

fn item(scope: ElementRef<'_>, syntax: Syntax, base: &Url, depth: usize) -> Value {
    let mut object = Map::new();
    if let Some(raw) = scope.value().attr(syntax.type_attr()) {
        let mut types: Vec<Value> = raw
            .split_whitespace()
            .filter_map(type_name)
            .map(Value::String)
            .collect();
        if types.len() == 1 {
            object.insert("@type".to_string(), types.remove(0));
        } else if !types.is_empty() {
            object.insert("@type".to_string(), Value::Array(types));
        }
    }
    collect_properties(scope, syntax, base, depth, &mut object);
    Value::Object(object)
}

/// `https://schema.org/LocalBusiness` and `schema:LocalBusiness` both become
/// `LocalBusiness`.
fn type_name(raw: &str) -> Option<String> {
    raw.rsplit(['/', '#', ':'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
}

/// Walks the scope's subtree in document order with an explicit stack,
/// stopping at nested scopes. Page nesting depth never reaches the call
/// stack.
fn collect_properties(
    scope: ElementRef<'_>,
    syntax: Syntax,
    base: &Url,
    depth: usize,
    object: &mut Map<String, Value>,
) {
    let mut pending: Vec<ElementRef<'_>> =
        scope.children().rev().filter_map(ElementRef::wrap).collect();

    while let Some(element) = pending.pop() {
        let nested_scope = syntax.is_scope(element);
        if let Some(names) = element.value().attr(syntax.prop_attr()) {
            let value = if !nested_scope {
                property_value(element, base)
            } else if depth < MAX_SCOPE_DEPTH {
                item(element, syntax, base, depth + 1)
            } else {
                tracing::debug!(depth, "skipping item scope nested too deeply");
                Value::Null
            };
            for name in names.split_whitespace().filter_map(type_name) {
                insert_property(object, name, value.clone());
            }
        }
        if !nested_scope {
            pending.extend(element.children().rev().filter_map(ElementRef::wrap));
        }
    }
}

fn property_value(element: ElementRef<'_>, base: &Url) -> Value {
    let el = element.value();
    let url_attr = match el.name() {
        "a" | "link" | "area" => Some("href"),
        "img" | "audio" | "video" | "source" | "iframe" | "embed" | "track" => Some("src"),
        "object" => Some("data"),
        _ => None,
    };
    let text = if let Some(content) = el.attr("content") {
        clean_text(content)
    } else if let Some(attr) = url_attr {
        el.attr(attr).and_then(|href| resolve_url(base, href))
    } else {
        let machine = match el.name() {
            "time" => el.attr("datetime").and_then(clean_text),
            "data" | "meter" => el.attr("value").and_then(clean_text),
            _ => None,
        };
        machine.or_else(|| element_text(element))
    };
    text.map_or(Value::Null, Value::String)
}

fn insert_property(object: &mut Map<String, Value>, name: String, value: Value) {
    if value.is_null() {
        return;
    }
    match object.get_mut(&name) {
        None => {
            object.insert(name, value);
        }
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// OpenGraph-style `<meta property>` pairs. The first value of a repeated
/// property wins.
#[must_use]
pub fn opengraph(document: &Html) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for meta in document.select(&META_PROPERTY_SEL) {
        let el = meta.value();
        let (Some(property), Some(content)) = (el.attr("property"), el.attr("content")) else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        if !(property.starts_with("og:") || property.starts_with("product:")) {
            continue;
        }
        if let Some(content) = clean_text(content) {
            properties.entry(property).or_insert(content);
        }
    }
    properties
}
