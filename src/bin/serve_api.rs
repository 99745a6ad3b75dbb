use anyhow::Result;
use clap::Parser;
use tracing::info;

use psb_scraper::config::Config;
use psb_scraper::{api, db};

/// Serve the read-only query API over the scraped rows.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Override PORT from the environment
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = Config::from_env()?;
    let port = args.port.unwrap_or(cfg.port);

    let pool = db::init_pool(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;

    let app = api::router(pool);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
