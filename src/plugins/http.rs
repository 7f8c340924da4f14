//! HTTP plugin transport
//!
//! JSON over HTTP: `POST <endpoint>/account-collector/init` and
//! `POST <endpoint>/account-collector/sync`. Only the connect phase is bounded;
//! a long discovery run holds the request open for as long as it takes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, warn};

use crate::config::PluginConfig;
use crate::error::SyncError;
use crate::models::provider::PluginInfo;
use crate::plugins::{PluginEndpoint, PluginRegistry, PluginTransport, SyncRequest, SyncResponse};

const INIT_PATH: &str = "account-collector/init";
const SYNC_PATH: &str = "account-collector/sync";

#[derive(Debug, Clone)]
pub struct HttpPluginTransport {
    client: Client,
    registry: PluginRegistry,
}

impl HttpPluginTransport {
    pub fn new(registry: PluginRegistry, connect_timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SyncError::PluginInvocation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, registry })
    }

    pub fn from_config(config: &PluginConfig) -> Result<Self, SyncError> {
        Self::new(
            PluginRegistry::from_config(config),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &PluginEndpoint,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, SyncError> {
        let url = format!("{}/{}", endpoint.endpoint, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(version) = &endpoint.version {
            request = request.header("X-Plugin-Version", version);
        }

        let response = request.send().await.map_err(|e| {
            SyncError::PluginInvocation(format!("{} request to {url} failed: {e}", endpoint.plugin_id))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(plugin_id = %endpoint.plugin_id, %status, "plugin call failed");
            return Err(SyncError::PluginInvocation(format!(
                "{} returned {status}: {body}",
                endpoint.plugin_id
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PluginTransport for HttpPluginTransport {
    async fn resolve_endpoint(
        &self,
        plugin_info: &PluginInfo,
        domain_id: &str,
    ) -> Result<PluginEndpoint, SyncError> {
        let endpoint = self.registry.resolve(plugin_info)?;
        debug!(plugin_id = %endpoint.plugin_id, domain_id = %domain_id, endpoint = %endpoint.endpoint, "resolved plugin endpoint");
        Ok(endpoint)
    }

    async fn init(
        &self,
        endpoint: &PluginEndpoint,
        options: &Map<String, JsonValue>,
    ) -> Result<(), SyncError> {
        self.post(endpoint, INIT_PATH, &json!({ "options": options }))
            .await?;
        Ok(())
    }

    async fn sync(
        &self,
        endpoint: &PluginEndpoint,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        let response = self.post(endpoint, SYNC_PATH, request).await?;
        response.json::<SyncResponse>().await.map_err(|e| {
            SyncError::PluginInvocation(format!(
                "{} returned an unreadable sync response: {e}",
                endpoint.plugin_id
            ))
        })
    }
}
