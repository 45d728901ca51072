use futures::stream::{self, BoxStream, StreamExt};

use super::{FetchOutcome, Fetcher};
use crate::error::FetchError;

impl Fetcher {
    /// Per-call limit: the override when it is tighter than the global gate,
    /// otherwise the global capacity. An override of `0` counts as none.
    #[must_use]
    pub fn effective_concurrency(&self, max_concurrency: Option<usize>) -> usize {
        let global = self.max_concurrency();
        max_concurrency
            .filter(|&n| n > 0)
            .map_or(global, |n| n.min(global))
    }

    /// Fetches every URL and yields `(url, result)` pairs as each one
    /// finishes, not in submission order. The stream itself never fails.
    pub fn fetch_many(
        &self,
        urls: Vec<String>,
        max_concurrency: Option<usize>,
    ) -> BoxStream<'_, (String, Result<FetchOutcome, FetchError>)> {
        let limit = self.effective_concurrency(max_concurrency);
        tracing::debug!(urls = urls.len(), limit, "starting batch fetch");

        stream::iter(urls)
            .map(move |url| async move {
                let result = self.fetch(&url).await;
                (url, result)
            })
            .buffer_unordered(limit)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use bizscout_core::ScraperSettings;

    use super::*;

    fn fetcher(global: usize) -> Fetcher {
        let settings = ScraperSettings {
            http_max_concurrency: global,
            ..ScraperSettings::default()
        };
        Fetcher::with_seed(&settings, 9).unwrap()
    }

    #[test]
    fn override_can_only_tighten_the_gate() {
        let f = fetcher(8);
        assert_eq!(f.effective_concurrency(None), 8);
        assert_eq!(f.effective_concurrency(Some(2)), 2);
        assert_eq!(f.effective_concurrency(Some(32)), 8);
    }

    #[test]
    fn zero_override_means_no_override() {
        assert_eq!(fetcher(8).effective_concurrency(Some(0)), 8);
    }

    #[tokio::test]
    async fn batch_reports_each_invalid_url_without_failing() {
        let f = fetcher(4);
        let results: Vec<_> = f
            .fetch_many(vec!["nope".to_string(), "also nope".to_string()], None)
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|(_, r)| matches!(r, Err(FetchError::InvalidUrl { .. }))));
    }
}
