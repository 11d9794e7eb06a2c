use crate::config::ScoutConfig;
use crate::kernel::layout::FormKind;
use crate::outbox::{DeliveryError, DeliveryReceipt, SubmissionSink};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP access to the scouting server.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    path: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    pub fn from_config(config: &ScoutConfig) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The schema document, fetched once per session.
    pub async fn fetch_schema(&self) -> Result<Value> {
        let response = self
            .client
            .get(self.url("/api/config"))
            .send()
            .await
            .context("fetching form schema")?;

        if !response.status().is_success() {
            return Err(anyhow!("Schema request failed: {}", response.status()));
        }

        response.json().await.context("decoding form schema")
    }

    /// Upload image bytes and return the server-assigned reference.
    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .context("uploading image")?;

        if !response.status().is_success() {
            return Err(anyhow!("Upload rejected: {}", response.status()));
        }

        let body: UploadResponse = response.json().await.context("decoding upload response")?;
        body.path
            .ok_or_else(|| anyhow!("Upload response carried no path"))
    }

    pub async fn upload_image_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image");
        self.upload_image(file_name, bytes).await
    }

    /// Any HTTP response at all counts as reachable.
    pub async fn reachable(&self) -> bool {
        match self.client.get(self.url("/api/config")).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("reachability probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl SubmissionSink for ApiClient {
    async fn deliver(&self, kind: FormKind, payload: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(self.url(kind.endpoint()))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        // The record is stored once the server says 2xx; an odd body must not
        // send it back to the queue.
        match response.json::<DeliveryReceipt>().await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                warn!(kind = %kind, "submission accepted but response unreadable: {}", e);
                Ok(DeliveryReceipt::default())
            }
        }
    }
}
