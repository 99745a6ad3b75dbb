use anyhow::Result;
use clap::Parser;
use tracing::info;

use psb_scraper::cloudinary::CloudinaryClient;
use psb_scraper::config::Config;
use psb_scraper::imgur::ImgurClient;
use psb_scraper::reddit::RedditClient;
use psb_scraper::{db, pipeline};

/// Run one complete scrape session against the configured subreddit.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Override SUBREDDIT from the environment
    #[arg(long)]
    subreddit: Option<String>,

    /// Override POSTS_PER_CATEGORY from the environment
    #[arg(long)]
    posts_per_category: Option<u32>,

    /// Override PHOTOSHOPS_PER_POST from the environment
    #[arg(long)]
    photoshops_per_post: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = Config::from_env()?;
    if let Some(subreddit) = args.subreddit {
        cfg.subreddit = subreddit;
    }
    if let Some(n) = args.posts_per_category {
        cfg.posts_per_category = n;
    }
    if let Some(n) = args.photoshops_per_post {
        cfg.photoshops_per_post = n;
    }

    let pool = db::init_pool(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;

    let reddit = RedditClient::new(cfg.reddit.clone());
    let imgur = ImgurClient::new(cfg.imgur.client_id.clone());
    let store = CloudinaryClient::new(&cfg.cloudinary);

    let session_id = pipeline::run_session(&pool, &reddit, &imgur, &store, &cfg).await?;
    info!(session_id, "done");
    Ok(())
}
