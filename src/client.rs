//! Admin Client
//!
//! Small HTTP client for the admin endpoints, used by `colstore-cli`.

use reqwest::StatusCode;

use crate::admin::Listing;
use crate::error::{Result, StoreError};

/// Client for a running colstore server
#[derive(Debug, Clone)]
pub struct AdminClient {
    base_url: String,
    http: reqwest::Client,
}

impl AdminClient {
    /// Create a client for `server`, given as `host:port` or a full URL
    pub fn new(server: &str) -> Self {
        let base_url = if server.starts_with("http://") || server.starts_with("https://") {
            server.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", server.trim_end_matches('/'))
        };
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn create(&self, name: &str, partitions: &str) -> Result<()> {
        self.call("create", &[("col", name), ("numparts", partitions)])
            .await
            .map(drop)
    }

    pub async fn list(&self) -> Result<Listing> {
        let body = self.call("all", &[]).await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.call("rename", &[("old", old), ("new", new)])
            .await
            .map(drop)
    }

    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        self.call("drop", &[("col", name)]).await.map(drop)
    }

    pub async fn scrub(&self, name: &str) -> Result<()> {
        self.call("scrub", &[("col", name)]).await.map(drop)
    }

    pub async fn repartition(&self, name: &str, partitions: &str) -> Result<()> {
        self.call("repartition", &[("col", name), ("numparts", partitions)])
            .await
            .map(drop)
    }

    pub async fn flush(&self) -> Result<()> {
        self.call("flush", &[]).await.map(drop)
    }

    pub async fn version(&self) -> Result<String> {
        self.call("version", &[]).await
    }

    /// POST to an endpoint and return the body of a 2xx response
    async fn call(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(format!("{}: {}", url, e)))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(StoreError::Network(describe_failure(status, &body)))
        }
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    }
}
