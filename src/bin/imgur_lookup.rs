use anyhow::{anyhow, Result};
use clap::Parser;

use psb_scraper::imgur::{ImgurClient, ImgurLookup};

/// Resolve an imgur hash to a direct image link (debug tool).
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Image or album hash, e.g. 74LLAyk
    hash: String,

    /// Treat the hash as an album and return its first image
    #[arg(long)]
    album: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let client_id =
        std::env::var("IMGUR_CLIENT_ID").map_err(|_| anyhow!("IMGUR_CLIENT_ID is not set"))?;
    let client = ImgurClient::new(client_id);

    let link = if args.album {
        client.album(&args.hash).await
    } else {
        client.image(&args.hash).await
    };
    match link {
        Some(link) => {
            println!("{link}");
            Ok(())
        }
        None => Err(anyhow!("lookup failed for {}", args.hash)),
    }
}
