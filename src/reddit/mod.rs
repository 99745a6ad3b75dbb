//! Reddit content source: OAuth token refresh plus listing/comment fetches.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;
use crate::model::Category;
use crate::reddit::model::{Comment, Listing, Submission, Thing, TokenResp};

pub mod model;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com/";

/// How many top-level comments to pull per post before ranking; the
/// derivative cap is applied after sorting by score.
const COMMENT_FETCH_LIMIT: u32 = 100;

/// Seam between the pipeline and the upstream content source.
#[async_trait]
pub trait RedditFeed: Send + Sync {
    /// Up to `limit` submissions for one category, in the category's native
    /// ordering.
    async fn listing(&self, subreddit: &str, category: Category, limit: u32)
        -> Result<Vec<Submission>>;

    /// Top-level comments of a submission, unranked.
    async fn top_comments(&self, article: &str) -> Result<Vec<Comment>>;
}

pub struct RedditClient {
    http: Client,
    oauth_base: Url,
    token_url: Url,
    creds: config::Reddit,
    token: OnceCell<String>,
}

impl RedditClient {
    pub fn new(creds: config::Reddit) -> Self {
        Self::with_base_urls(
            creds,
            Url::parse(TOKEN_URL).expect("valid token URL"),
            Url::parse(OAUTH_BASE).expect("valid oauth URL"),
        )
    }

    pub fn with_base_urls(creds: config::Reddit, token_url: Url, oauth_base: Url) -> Self {
        let http = Client::builder()
            .user_agent(creds.user_agent.clone())
            .build()
            .expect("reqwest client");
        Self {
            http,
            oauth_base,
            token_url,
            creds,
            token: OnceCell::new(),
        }
    }

    /// Exchange the refresh token for a bearer token, once per run.
    async fn bearer(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let res = self
                    .http
                    .post(self.token_url.clone())
                    .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", self.creds.refresh_token.as_str()),
                    ])
                    .send()
                    .await
                    .context("failed to reach reddit token endpoint")?;
                if !res.status().is_success() {
                    return Err(anyhow!(
                        "reddit token error {}: {}",
                        res.status(),
                        res.text().await.unwrap_or_default()
                    ));
                }
                let payload = res
                    .json::<TokenResp>()
                    .await
                    .context("invalid reddit token response")?;
                info!("obtained reddit access token");
                Ok::<_, anyhow::Error>(payload.access_token)
            })
            .await?;
        Ok(token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let bearer = self.bearer().await?;
        let res = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .context("failed to reach reddit")?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "reddit error {}: {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        res.json::<T>().await.context("invalid reddit response JSON")
    }
}

fn listing_url(base: &Url, subreddit: &str, category: Category, limit: u32) -> Result<Url> {
    let mut url = base
        .join(&format!("r/{}/{}", subreddit, category.listing_path()))
        .context("invalid listing path")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", &limit.to_string());
        if let Some(window) = category.time_window() {
            query.append_pair("t", window);
        }
    }
    Ok(url)
}

fn comments_url(base: &Url, article: &str) -> Result<Url> {
    let mut url = base
        .join(&format!("comments/{article}"))
        .context("invalid comments path")?;
    url.query_pairs_mut()
        .append_pair("depth", "1")
        .append_pair("limit", &COMMENT_FETCH_LIMIT.to_string())
        .append_pair("sort", "top");
    Ok(url)
}

#[async_trait]
impl RedditFeed for RedditClient {
    async fn listing(
        &self,
        subreddit: &str,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Submission>> {
        let url = listing_url(&self.oauth_base, subreddit, category, limit)?;
        let listing = self.get_json::<Listing<Submission>>(url).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|thing| thing.data)
            .collect())
    }

    async fn top_comments(&self, article: &str) -> Result<Vec<Comment>> {
        let url = comments_url(&self.oauth_base, article)?;
        // The comments endpoint returns two listings: the post itself, then
        // its top-level comments.
        let listings = self.get_json::<Vec<Listing<Comment>>>(url).await?;
        let comments = listings
            .into_iter()
            .nth(1)
            .map(|listing| listing.data.children)
            .unwrap_or_default()
            .into_iter()
            .filter(|thing: &Thing<Comment>| thing.kind == "t1")
            .map(|thing| thing.data)
            .collect();
        Ok(comments)
    }
}
