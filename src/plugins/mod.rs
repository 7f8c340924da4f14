//! # Discovery Plugins
//!
//! The [`PluginTransport`] seam through which the executor talks to an
//! account-collector plugin, the typed records plugins return, and the
//! HTTP implementation used in production.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::SyncError;
use crate::models::provider::PluginInfo;

pub mod http;
pub mod registry;
pub mod types;

pub use http::HttpPluginTransport;
pub use registry::PluginRegistry;
pub use types::{DiscoveredRecord, LocationNode, PluginEndpoint, SyncRequest, SyncResponse};

#[async_trait]
pub trait PluginTransport: Send + Sync {
    /// Locates the plugin serving `plugin_info` for a domain.
    async fn resolve_endpoint(
        &self,
        plugin_info: &PluginInfo,
        domain_id: &str,
    ) -> Result<PluginEndpoint, SyncError>;

    async fn init(
        &self,
        endpoint: &PluginEndpoint,
        options: &Map<String, JsonValue>,
    ) -> Result<(), SyncError>;

    async fn sync(
        &self,
        endpoint: &PluginEndpoint,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError>;
}
