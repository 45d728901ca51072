pub mod app_config;
pub mod config;
pub mod listings;

pub use app_config::{AppConfig, Environment, ScraperSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use listings::{
    BusinessRecord, ExtractionMethod, ScrapeError, ScrapeMeta, ScrapeOutput, ScrapeStage,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("{feature} is disabled: {reason}")]
    FeatureDisabled {
        feature: &'static str,
        reason: String,
    },
}
