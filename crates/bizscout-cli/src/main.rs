mod scrape;
mod store;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bizscout-cli")]
#[command(about = "Scrape business-for-sale listings and manage scraping sites")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape listing pages and print businesses, errors and run metadata as JSON.
    Scrape {
        #[arg(required = true, num_args = 1..)]
        urls: Vec<String>,
        /// Per-call concurrency cap (never above the configured global limit).
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..=32))]
        max_concurrency: Option<u16>,
    },
    /// List active scraping sites.
    Sites,
    /// Register a scraping site for scheduled ingest.
    AddSite { url: String },
    /// Show the most recently stored businesses.
    Businesses {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = bizscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape {
            urls,
            max_concurrency,
        }) => scrape::run_scrape(&config, &urls, max_concurrency.map(usize::from)).await,
        Some(Commands::Sites) => store::run_list_sites(&config).await,
        Some(Commands::AddSite { url }) => store::run_add_site(&config, &url).await,
        Some(Commands::Businesses { limit }) => store::run_list_businesses(&config, limit).await,
        Some(Commands::Db { command }) => match command {
            DbCommands::Ping => store::run_db_ping(&config).await,
            DbCommands::Migrate => store::run_db_migrate(&config).await,
        },
        None => {
            println!("bizscout-cli: run with --help to see available commands");
            Ok(())
        }
    }
}
