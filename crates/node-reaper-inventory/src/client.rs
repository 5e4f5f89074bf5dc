//! HTTP client for the instance inventory service.
//!
//! The inventory service answers `GET /v1/instances/{instance_id}` with the
//! instance's recorded network identity.

use std::time::Duration;

use async_trait::async_trait;
use node_reaper_core::{InstanceId, NodeName};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{InventoryError, Result};
use crate::resolver::{InventoryResolver, NodeIdentity};
use crate::InventoryConfig;

/// Raw instance record returned by the inventory service.
#[derive(Debug, Deserialize)]
struct InstanceRecord {
    #[serde(default)]
    private_dns_name: Option<String>,
}

/// Inventory resolver backed by the inventory service's REST API.
#[derive(Debug, Clone)]
pub struct HttpInventoryResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpInventoryResolver {
    /// Create a new resolver from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &InventoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| InventoryError::Config(format!("failed to create HTTP client: {e}")))?;

        Self::with_client(client, &config.base_url)
    }

    /// Create a resolver with a custom reqwest client.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Config` if the base URL is invalid.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| InventoryError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InventoryError::Config(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Build the lookup URL, encoding the instance id as a single path segment.
    fn instance_url(&self, instance_id: &InstanceId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "instances", instance_id.as_str()]);
        }
        url
    }
}

#[async_trait]
impl InventoryResolver for HttpInventoryResolver {
    async fn resolve_node_name(&self, instance_id: &InstanceId) -> Result<NodeIdentity> {
        let url = self.instance_url(instance_id);
        debug!(instance_id = %instance_id, "Looking up instance in inventory");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InventoryError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(InventoryError::NotFound(instance_id.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Transient(format!(
                "inventory returned {status}: {body}"
            )));
        }

        let record: InstanceRecord = response
            .json()
            .await
            .map_err(|e| InventoryError::Transient(format!("invalid response: {e}")))?;

        let name = record
            .private_dns_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| InventoryError::NotFound(instance_id.clone()))?;

        let private_name =
            NodeName::new(name.trim()).map_err(|e| InventoryError::InvalidRecord {
                instance_id: instance_id.clone(),
                reason: format!("invalid node name: {e}"),
            })?;

        debug!(
            instance_id = %instance_id,
            node = %private_name,
            "Resolved instance to node"
        );

        Ok(NodeIdentity::new(private_name))
    }
}
