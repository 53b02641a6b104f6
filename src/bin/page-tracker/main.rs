use anyhow::Context;
use clap::Parser;
use page_tracker::{app::AppData, config::Config};
use std::path::PathBuf;

/// Fetch web pages through a redis-backed cache and count the fetches.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path of the config file
    #[arg(short, long, env = "PAGE_TRACKER_CFG_PATH")]
    config: Option<PathBuf>,

    /// How many times each URL is requested
    #[arg(short, long, default_value_t = 1)]
    repeat: usize,

    /// Print the fetch counter of each URL after its body
    #[arg(long)]
    show_count: bool,

    #[arg(required = true)]
    urls: Vec<reqwest::Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(std::io::stderr)
        .init();
    match &config.source {
        Some(path) => tracing::info!("config loaded from {path:?}"),
        None => tracing::info!("no config file found, using defaults"),
    }

    let app_data = AppData::prepare(&config).await?;
    run(app_data, &args).await
}

async fn run(app_data: AppData, args: &Args) -> anyhow::Result<()> {
    for url in &args.urls {
        for _ in 0..args.repeat {
            let body = app_data
                .pages
                .get(url)
                .await
                .with_context(|| format!("fail to get {url}"))?;
            println!("{body}");
        }

        if args.show_count {
            let count = app_data.pages.fetch_count(url).await?;
            println!("{url} fetched {count} time(s)");
        }
    }

    Ok(())
}
