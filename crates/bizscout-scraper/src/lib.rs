pub mod antibot;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod headers;
pub mod retry;

pub use coordinator::{Coordinator, PageOutcome};
pub use error::{ExtractError, FetchError, ValidationError};
pub use extract::{extract_page, CandidateFilter, ExtractionCandidate};
pub use fetcher::{FetchOutcome, Fetcher};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
