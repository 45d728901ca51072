//! Background job scheduler.
//!
//! Runs an ingest pass shortly after startup and then every
//! `cron_interval_hours`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::ingest::Ingestor;

const STARTUP_DELAY: Duration = Duration::from_secs(1);
const FALLBACK_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Converts the configured interval in hours to a period.
pub fn ingest_interval(hours: f64) -> Duration {
    Duration::try_from_secs_f64(hours * 3600.0)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(FALLBACK_INTERVAL)
}

/// Runs a scheduled pass if the ingestor is still alive. Returns whether a
/// pass was attempted.
async fn run_if_alive(ingestor: &Weak<Ingestor>, kind: &'static str) -> bool {
    let Some(ingestor) = ingestor.upgrade() else {
        tracing::debug!(kind, "scheduler: ingestor dropped; skipping tick");
        return false;
    };
    tracing::info!(kind, "scheduler: starting ingest pass");
    ingestor.run_scheduled().await;
    true
}

/// Builds and starts the background job scheduler.
///
/// Jobs hold only a weak handle to the ingestor, so dropping the last strong
/// handle at shutdown releases the shared coordinator even while the
/// scheduler's own tasks linger.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    ingestor: &Arc<Ingestor>,
    interval_hours: f64,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let interval = ingest_interval(interval_hours);

    let startup = Arc::downgrade(ingestor);
    let first_run = Job::new_one_shot_async(STARTUP_DELAY, move |_uuid, _lock| {
        let ingestor = Weak::clone(&startup);
        Box::pin(async move {
            run_if_alive(&ingestor, "initial").await;
        })
    })?;
    scheduler.add(first_run).await?;

    let periodic = Arc::downgrade(ingestor);
    let repeated = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let ingestor = Weak::clone(&periodic);
        Box::pin(async move {
            run_if_alive(&ingestor, "periodic").await;
        })
    })?;
    scheduler.add(repeated).await?;

    scheduler.start().await?;
    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: ingest jobs registered"
    );
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_converts_hours() {
        assert_eq!(ingest_interval(6.0), Duration::from_secs(21_600));
        assert_eq!(ingest_interval(0.5), Duration::from_secs(1_800));
    }

    #[test]
    fn unusable_interval_falls_back() {
        assert_eq!(ingest_interval(0.0), FALLBACK_INTERVAL);
        assert_eq!(ingest_interval(f64::NAN), FALLBACK_INTERVAL);
        assert_eq!(ingest_interval(-1.0), FALLBACK_INTERVAL);
    }

    #[tokio::test]
    async fn dropped_ingestor_releases_the_coordinator() {
        use bizscout_core::ScraperSettings;
        use bizscout_scraper::Coordinator;
        use sqlx::postgres::PgPoolOptions;

        let coordinator = Arc::new(Coordinator::new(ScraperSettings::default()).unwrap());
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/bizscout_unused")
            .unwrap();
        let ingestor = Arc::new(Ingestor::new(pool, Arc::clone(&coordinator)));
        let job_handle = Arc::downgrade(&ingestor);

        drop(ingestor);
        assert!(!run_if_alive(&job_handle, "periodic").await);
        match Arc::try_unwrap(coordinator) {
            Ok(coordinator) => coordinator.close(),
            Err(_) => panic!("coordinator still shared after the ingestor was dropped"),
        }
    }
}
