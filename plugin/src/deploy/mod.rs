//! Deployment plugins and the engine they share
//!
//! A plugin receives a job context, drives one deployment to a terminal
//! state and returns a [`RunResult`].

pub mod aggregate;
pub mod arsenal;
pub mod follow;
pub mod marathon;
pub mod options;
pub mod retry;
pub mod ticker;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deploy_models::models::plugin::PluginInfo;

use crate::errors::PluginError;
use crate::job::context::JobContext;
use crate::job::result::RunResult;

use self::arsenal::ArsenalPlugin;
use self::marathon::MarathonPlugin;

/// A deployment plugin the host can run
#[async_trait]
pub trait DeploymentPlugin: Send + Sync {
    /// Name the plugin is registered under
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Run one deployment to completion
    async fn run(&self, job: Arc<dyn JobContext>) -> RunResult;
}

/// Plugins known to the host, by name
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn DeploymentPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in Arsenal and Marathon plugins
    pub fn with_defaults(http_timeout: Duration) -> Result<Self, PluginError> {
        let mut registry = Self::new();
        registry.register(Arc::new(ArsenalPlugin::new(http_timeout)))?;
        registry.register(Arc::new(MarathonPlugin::new(http_timeout)))?;
        Ok(registry)
    }

    /// Register a plugin, rejecting duplicate names
    pub fn register(&mut self, plugin: Arc<dyn DeploymentPlugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::Configuration(format!(
                "plugin {} is already registered",
                name
            )));
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DeploymentPlugin>> {
        self.plugins.get(name).cloned()
    }

    /// Registered plugins sorted by name
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .plugins
            .values()
            .map(|p| PluginInfo {
                name: p.name().to_string(),
                description: p.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
