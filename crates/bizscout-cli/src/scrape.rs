//! `scrape` command: one coordinator call, result printed as pretty JSON.

use bizscout_core::{AppConfig, ScrapeOutput};
use bizscout_scraper::Coordinator;

/// Scrapes `urls` with a fresh coordinator and prints the result triple.
/// Per-URL failures appear in the JSON `errors` list, not as a failed exit.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the output cannot
/// be serialized.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    urls: &[String],
    max_concurrency: Option<usize>,
) -> anyhow::Result<()> {
    if urls.len() > config.scraper.request_max_urls {
        tracing::warn!(
            requested = urls.len(),
            max = config.scraper.request_max_urls,
            "more URLs than SCRAPER_REQUEST_MAX_URLS; extras will be dropped"
        );
    }

    let coordinator = Coordinator::new(config.scraper.clone())?;
    let output = coordinator.scrape(urls, max_concurrency).await;
    coordinator.close();

    println!("{}", render_output(&output)?);
    Ok(())
}

fn render_output(output: &ScrapeOutput) -> serde_json::Result<String> {
    serde_json::to_string_pretty(output)
}
