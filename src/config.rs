//! Environment-sourced configuration for the scraper and the read API.
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub reddit: Reddit,
    pub imgur: Imgur,
    pub cloudinary: Cloudinary,
    pub database_url: String,
    pub subreddit: String,
    pub posts_per_category: u32,
    pub photoshops_per_post: usize,
    pub port: u16,
}

/// Upstream content-source (reddit OAuth) credentials.
#[derive(Debug, Clone)]
pub struct Reddit {
    pub user_agent: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Indirect image-host credentials.
#[derive(Debug, Clone)]
pub struct Imgur {
    pub client_id: String,
}

/// Durable-storage credentials.
#[derive(Debug, Clone)]
pub struct Cloudinary {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(&vars)
    }

    /// Build a configuration from an explicit key→value map. Kept separate
    /// from `from_env` so tests never have to mutate process environment.
    pub fn from_lookup(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Config {
            reddit: Reddit {
                user_agent: required(vars, "REDDIT_USER_AGENT")?,
                client_id: required(vars, "REDDIT_CLIENT_ID")?,
                client_secret: required(vars, "REDDIT_CLIENT_SECRET")?,
                refresh_token: required(vars, "REDDIT_REFRESH_TOKEN")?,
            },
            imgur: Imgur {
                client_id: required(vars, "IMGUR_CLIENT_ID")?,
            },
            cloudinary: Cloudinary {
                cloud_name: required(vars, "CLOUDINARY_CLOUD_NAME")?,
                api_key: required(vars, "CLOUDINARY_API_KEY")?,
                api_secret: required(vars, "CLOUDINARY_API_SECRET")?,
            },
            database_url: optional(vars, "DATABASE_URL", "sqlite://data/psb.db"),
            subreddit: optional(vars, "SUBREDDIT", "photoshopbattles"),
            posts_per_category: positive(vars, "POSTS_PER_CATEGORY", 10)? as u32,
            photoshops_per_post: positive(vars, "PHOTOSHOPS_PER_POST", 5)? as usize,
            port: positive(vars, "PORT", 5000)?
                .try_into()
                .map_err(|_| ConfigError::Invalid("PORT", "out of range".into()))?,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    match vars.get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn optional(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    match vars.get(key) {
        Some(v) if !v.trim().is_empty() => v.clone(),
        _ => default.to_string(),
    }
}

fn positive(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = vars.get(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid(key, raw.clone())),
    }
}
