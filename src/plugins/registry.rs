//! Static plugin routing table

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::error::SyncError;
use crate::models::provider::PluginInfo;
use crate::plugins::PluginEndpoint;

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    endpoints: HashMap<String, PluginEndpoint>,
}

impl PluginRegistry {
    pub fn from_config(config: &PluginConfig) -> Self {
        let endpoints = config
            .endpoints
            .iter()
            .map(|entry| {
                (
                    entry.plugin_id.clone(),
                    PluginEndpoint {
                        plugin_id: entry.plugin_id.clone(),
                        endpoint: entry.endpoint.trim_end_matches('/').to_string(),
                        version: entry.version.clone(),
                    },
                )
            })
            .collect();
        Self { endpoints }
    }

    pub fn register(&mut self, endpoint: PluginEndpoint) {
        self.endpoints.insert(endpoint.plugin_id.clone(), endpoint);
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Resolves a provider's plugin binding; a version pinned in
    /// `plugin_info` wins over the registered one.
    pub fn resolve(&self, plugin_info: &PluginInfo) -> Result<PluginEndpoint, SyncError> {
        let plugin_id = plugin_info
            .plugin_id
            .as_deref()
            .ok_or_else(|| SyncError::PluginInvocation("provider has no plugin_id".to_string()))?;

        let mut endpoint = self.endpoints.get(plugin_id).cloned().ok_or_else(|| {
            SyncError::PluginInvocation(format!("no endpoint registered for plugin {plugin_id}"))
        })?;
        if plugin_info.version.is_some() {
            endpoint.version = plugin_info.version.clone();
        }
        Ok(endpoint)
    }
}
