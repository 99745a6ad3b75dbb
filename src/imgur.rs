//! Indirect image-host lookups (imgur).
//!
//! Both lookups deliberately return `Option` instead of `Result`: a failed
//! or empty lookup means "skip this comment", never "abort the run", so
//! callers get the skip behavior without special-casing errors.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::warn;

const IMGUR_API_BASE: &str = "https://api.imgur.com/3/";

#[async_trait]
pub trait ImgurLookup: Send + Sync {
    /// Direct link for a single-image hash, or `None` on any failure.
    async fn image(&self, hash: &str) -> Option<String>;

    /// Direct link for the first image of an album hash, or `None` on any
    /// failure (an empty album counts as a failure).
    async fn album(&self, hash: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct ImgurClient {
    http: Client,
    base_url: Url,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct ImageResp {
    data: ImageData,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    link: String,
}

#[derive(Debug, Deserialize)]
struct AlbumResp {
    data: AlbumData,
}

#[derive(Debug, Deserialize)]
struct AlbumData {
    #[serde(default)]
    images: Vec<ImageData>,
}

impl ImgurClient {
    pub fn new(client_id: String) -> Self {
        let base_url = Url::parse(IMGUR_API_BASE).expect("valid default imgur URL");
        Self::with_base_url(client_id, base_url)
    }

    pub fn with_base_url(client_id: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("psb-scraper/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            client_id,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("invalid imgur path")?;
        let res = self
            .http
            .get(url)
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .send()
            .await
            .context("failed to reach imgur")?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "imgur error {}: {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        res.json::<T>().await.context("invalid imgur response JSON")
    }
}

#[async_trait]
impl ImgurLookup for ImgurClient {
    async fn image(&self, hash: &str) -> Option<String> {
        match self.get::<ImageResp>(&format!("image/{hash}")).await {
            Ok(resp) => Some(resp.data.link),
            Err(err) => {
                warn!(?err, hash, "imgur image lookup failed");
                None
            }
        }
    }

    async fn album(&self, hash: &str) -> Option<String> {
        match self.get::<AlbumResp>(&format!("album/{hash}")).await {
            Ok(resp) => match resp.data.images.into_iter().next() {
                Some(first) => Some(first.link),
                None => {
                    warn!(hash, "imgur album is empty");
                    None
                }
            },
            Err(err) => {
                warn!(?err, hash, "imgur album lookup failed");
                None
            }
        }
    }
}
