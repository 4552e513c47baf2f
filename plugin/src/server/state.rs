//! Server state

use std::sync::Arc;

use crate::deploy::PluginRegistry;
use crate::job::sink::LogSink;

/// Server state shared across handlers
pub struct ServerState {
    pub registry: Arc<PluginRegistry>,
    pub sink: Arc<dyn LogSink>,
}

impl ServerState {
    pub fn new(registry: Arc<PluginRegistry>, sink: Arc<dyn LogSink>) -> Self {
        Self { registry, sink }
    }
}
