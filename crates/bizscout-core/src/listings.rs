use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which sub-extractor produced a record. Serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExtractionMethod {
    Structured,
    Heuristic,
}

impl ExtractionMethod {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            ExtractionMethod::Structured => 1,
            ExtractionMethod::Heuristic => 2,
        }
    }
}

impl From<ExtractionMethod> for u8 {
    fn from(method: ExtractionMethod) -> Self {
        method.code()
    }
}

impl TryFrom<u8> for ExtractionMethod {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ExtractionMethod::Structured),
            2 => Ok(ExtractionMethod::Heuristic),
            other => Err(format!("unknown extraction method code {other}")),
        }
    }
}

/// A validated business listing as returned to callers and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub title: String,
    /// Absolute `http`/`https` URL of the listing.
    pub listing_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub all_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    /// Position of the source container on its page. Structured records have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_index: Option<usize>,
    pub extraction_method: ExtractionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl BusinessRecord {
    /// Case-folded listing URL, or the case-folded title when the URL is empty.
    #[must_use]
    pub fn identity_key(&self) -> String {
        if self.listing_url.trim().is_empty() {
            self.title.to_lowercase()
        } else {
            self.listing_url.to_lowercase()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStage {
    Fetch,
    Parse,
    General,
}

impl std::fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeStage::Fetch => write!(f, "fetch"),
            ScrapeStage::Parse => write!(f, "parse"),
            ScrapeStage::General => write!(f, "general"),
        }
    }
}

/// One failed page (or site, for `General`) in a scrape run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeError {
    pub url: String,
    pub message: String,
    pub stage: ScrapeStage,
}

impl ScrapeError {
    #[must_use]
    pub fn new(url: impl Into<String>, message: impl Into<String>, stage: ScrapeStage) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
            stage,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeMeta {
    pub total_requested: usize,
    /// Requested URLs minus fetch-stage failures.
    pub total_succeeded: usize,
    pub total_businesses: usize,
    pub duration_ms: u64,
}

/// The complete result of one coordinator call. Always returned, never raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutput {
    pub businesses: Vec<BusinessRecord>,
    pub errors: Vec<ScrapeError>,
    pub meta: ScrapeMeta,
}
