//! Per-attempt request headers.
//!
//! Each attempt picks a User-Agent and Accept-Language from the configured
//! pools and derives the matching client-hint headers, so consecutive
//! requests do not share one fixed fingerprint.

use std::sync::LazyLock;

use bizscout_core::app_config::DEFAULT_USER_AGENT;
use bizscout_core::ScraperSettings;
use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const DEFAULT_CHROME_MAJOR: &str = "124";

static CHROME_MAJOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)chrome/(\d+)").expect("valid regex"));

const BASELINE: [(&str, &str); 8] = [
    ("accept", ACCEPT_HTML),
    ("cache-control", "max-age=0"),
    ("pragma", "no-cache"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
];

/// Browser family inferred from a User-Agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserFamily {
    Chrome { major: String, windows: bool },
    Safari,
    Other,
}

impl BrowserFamily {
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        let lowered = user_agent.to_lowercase();
        if lowered.contains("chrome") || lowered.contains("chromium") {
            let major = CHROME_MAJOR_RE
                .captures(user_agent)
                .and_then(|caps| caps.get(1))
                .map_or_else(|| DEFAULT_CHROME_MAJOR.to_string(), |m| m.as_str().to_string());
            BrowserFamily::Chrome {
                major,
                windows: lowered.contains("windows"),
            }
        } else if lowered.contains("safari") {
            BrowserFamily::Safari
        } else {
            BrowserFamily::Other
        }
    }

    /// `Sec-CH-UA`, `Sec-CH-UA-Mobile` and `Sec-CH-UA-Platform` values.
    fn client_hints(&self) -> Option<[(&'static str, String); 3]> {
        match self {
            BrowserFamily::Chrome { major, windows } => Some([
                (
                    "sec-ch-ua",
                    format!(
                        "\"Chromium\";v=\"{major}\", \"Google Chrome\";v=\"{major}\", \"Not.A/Brand\";v=\"99\""
                    ),
                ),
                ("sec-ch-ua-mobile", "?0".to_string()),
                (
                    "sec-ch-ua-platform",
                    if *windows { "\"Windows\"" } else { "\"macOS\"" }.to_string(),
                ),
            ]),
            BrowserFamily::Safari => Some([
                (
                    "sec-ch-ua",
                    "\"Not A Brand\";v=\"99\", \"Safari\";v=\"17\"".to_string(),
                ),
                ("sec-ch-ua-mobile", "?0".to_string()),
                ("sec-ch-ua-platform", "\"macOS\"".to_string()),
            ]),
            BrowserFamily::Other => None,
        }
    }
}

/// `host[:port]` of `url`, with the port only when it is explicit and
/// non-default.
#[must_use]
pub fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(HeaderName::from_static(name), v);
        }
        Err(_) => tracing::debug!(header = name, value, "skipping header with invalid value"),
    }
}

/// Builds the header set for one attempt against `url`.
pub fn build_headers<R: Rng + ?Sized>(
    url: &Url,
    settings: &ScraperSettings,
    rng: &mut R,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in BASELINE {
        insert(&mut headers, name, value);
    }

    let user_agent = settings
        .user_agent_pool
        .choose(rng)
        .map_or(DEFAULT_USER_AGENT, String::as_str);
    insert(&mut headers, "user-agent", user_agent);

    let language = settings
        .accept_language_pool
        .choose(rng)
        .map_or(DEFAULT_ACCEPT_LANGUAGE, String::as_str);
    insert(&mut headers, "accept-language", language);

    if let Some(hints) = BrowserFamily::from_user_agent(user_agent).client_hints() {
        for (name, value) in hints {
            insert(&mut headers, name, &value);
        }
    }

    if let Some(host) = host_with_port(url) {
        insert(
            &mut headers,
            "referer",
            &format!("{}://{host}/", url.scheme()),
        );
        insert(&mut headers, "host", &host);
    }

    headers
}
