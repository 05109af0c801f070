use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::AppConfig;

pub mod app;
pub mod config;
pub mod data;
pub mod enrich;
pub mod errors;
pub mod search;
pub mod sheets;

#[derive(Parser)]
#[command(name = "tabscout")]
struct Cli {
    #[arg(
        long = "serp-api-key",
        short = 'k',
        env = "TABSCOUT_SERP_API_KEY",
        help = "SerpAPI key used for the web search calls"
    )]
    serp_api_key: Option<String>,

    #[arg(
        long = "csv",
        short = 'c',
        help = "CSV file to load into the dashboard on startup"
    )]
    csv: Option<PathBuf>,

    #[arg(
        long = "client-secret",
        help = "Path to the installed-app client secret JSON (defaults to ./client_secret.json)"
    )]
    client_secret: Option<PathBuf>,

    #[arg(
        long = "token-cache",
        help = "Path to the persisted credential file (defaults to the user config dir)"
    )]
    token_cache: Option<PathBuf>,

    #[arg(
        long = "rate-limit",
        short = 'r',
        help = "Default pacing interval between search calls, in seconds (minimum 1.0)"
    )]
    rate_limit: Option<f64>,
}

pub fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tabscout=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting tabscout");
    let cli = Cli::parse();

    let config = AppConfig::resolve(
        cli.serp_api_key,
        cli.csv,
        cli.client_secret,
        cli.token_cache,
        cli.rate_limit,
    );

    info!(
        "Token cache: {:?}, exports: {:?}",
        config.token_cache_path, config.export_dir
    );

    app::run(config)
}
