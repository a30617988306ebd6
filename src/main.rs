use clap::{Parser, Subcommand};
use greaderd::adapters::{AdapterServices, AggregatorRegistry};
use greaderd::config::{init_tracing, Config};
use greaderd::greader::services::GReaderService;
use greaderd::greader::transport::{router, AppState};
use greaderd::header_extractor::HeaderElementExtractor;
use greaderd::http_client::HttpClient;
use greaderd::image_service::ImageService;
use greaderd::persistence::SqliteStore;
use greaderd::scheduler::{DefaultScheduler, SchedulerTrigger};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "greaderd", about = "Multi-user feed aggregation + Google Reader compatible API server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the GReader HTTP server.
    Serve,
    /// Run one feed immediately, ignoring its normal cadence.
    RunFeed { feed_id: i64 },
    /// Run every enabled feed once.
    RunDue,
    /// Delete articles older than `max_age_days`.
    PurgeOld {
        #[arg(default_value_t = 60)]
        max_age_days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env();
    let cli = Cli::parse();

    let store = SqliteStore::connect(&config.database_path).await?;

    let http = HttpClient::new(&config.user_agent, config.http_timeout, config.max_retries, config.retry_base_delay);
    let images = ImageService::new(http.clone());
    let headers = HeaderElementExtractor::new(http.clone(), images.clone());
    let services = AdapterServices { http, images: Arc::new(images), headers: Arc::new(headers) };
    let registry = AggregatorRegistry::new(services);

    match cli.command {
        Command::Serve => {
            let greader_service = Arc::new(GReaderService::new(store.clone()));
            let state = AppState { store, service: greader_service };
            let app = router(state);

            info!(addr = %config.bind_addr, "starting greaderd");
            let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
            axum::serve(listener, app).await?;
        }
        Command::RunFeed { feed_id } => {
            let scheduler = DefaultScheduler::new(store, registry);
            if let Err(e) = scheduler.run_feed(feed_id).await {
                error!(feed_id, error = %e, "run-feed failed");
                std::process::exit(1);
            }
        }
        Command::RunDue => {
            let scheduler = DefaultScheduler::new(store, registry);
            scheduler.run_due().await?;
        }
        Command::PurgeOld { max_age_days } => {
            let scheduler = DefaultScheduler::new(store, registry);
            let deleted = scheduler.purge_old(max_age_days).await?;
            info!(deleted, max_age_days, "purge complete");
        }
    }

    Ok(())
}
