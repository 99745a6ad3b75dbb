//! Durable asset storage on Cloudinary.
//!
//! Uploads are by reference: Cloudinary fetches the source URL server-side,
//! so the scraper never holds image bytes. Every upload lands under a
//! session-scoped folder so retiring a session is a prefix delete.
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::config;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to reach storage: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Canonical stored asset returned by an upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredAsset {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
    pub width: i64,
    pub height: i64,
    pub format: String,
}

/// Seam between the pipeline and durable storage.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload the image at `source_url` under `folder`; the provider fetches
    /// the source itself.
    async fn upload(&self, source_url: &str, folder: &str) -> Result<StoredAsset, UploadError>;

    /// Delete every asset under `folder`, then the folder object itself.
    async fn delete_folder(&self, folder: &str) -> Result<(), UploadError>;
}

#[derive(Clone)]
pub struct CloudinaryClient {
    http: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(cfg: &config::Cloudinary) -> Self {
        let http = Client::builder()
            .user_agent("psb-scraper/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            cloud_name: cfg.cloud_name.clone(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{API_BASE}/{}/image/upload", self.cloud_name)
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response, UploadError> {
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(UploadError::Rejected { status, body });
        }
        Ok(res)
    }
}

/// Hex SHA-256 over the `&`-joined, name-sorted params plus the API secret,
/// per Cloudinary's signed-request scheme.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(name, _)| *name);
    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, source_url: &str, folder: &str) -> Result<StoredAsset, UploadError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", folder),
                ("signature_algorithm", "sha256"),
                ("timestamp", &timestamp),
            ],
            &self.api_secret,
        );
        let form = [
            ("file", source_url),
            ("folder", folder),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let res = self.http.post(self.upload_url()).form(&form).send().await?;
        let res = Self::check(res).await?;
        let asset = res.json::<StoredAsset>().await?;
        info!(public_id = %asset.public_id, "uploaded asset");
        Ok(asset)
    }

    async fn delete_folder(&self, folder: &str) -> Result<(), UploadError> {
        // Assets first (delete by prefix), then the now-empty folder object.
        let resources_url = format!(
            "{API_BASE}/{}/resources/image/upload?prefix={}/",
            self.cloud_name, folder
        );
        let res = self
            .http
            .delete(&resources_url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;
        Self::check(res).await?;

        let folder_url = format!("{API_BASE}/{}/folders/{}", self.cloud_name, folder);
        let res = self
            .http
            .delete(&folder_url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;
        Self::check(res).await?;
        info!(folder, "deleted storage folder");
        Ok(())
    }
}
