use thiserror::Error;

/// Why a single page could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The target site refused the request. Never retried.
    #[error("request blocked by target site ({reason}) [{url}]")]
    Blocked { url: String, reason: String },

    #[error("fetcher is shut down")]
    Closed,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl FetchError {
    /// Transport-level failures are worth another attempt; policy decisions
    /// by the remote site and malformed input are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FetchError::Http { .. } | FetchError::UnexpectedStatus { .. }
        )
    }
}

/// A page-level extraction failure, reported with stage `parse`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot resolve page URL \"{url}\": {reason}")]
    InvalidPageUrl { url: String, reason: String },
}

/// A filtered candidate that still does not form a well-formed record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("candidate has no title")]
    MissingTitle,

    #[error("candidate has no listing URL")]
    MissingListingUrl,

    #[error("listing URL \"{0}\" is not an absolute http(s) URL")]
    InvalidListingUrl(String),
}
