use std::sync::Arc;

use crate::models::config::ServerConfig;
use crate::services::config_store::{ConfigStore, JsonConfigStore, MemoryConfigStore};
use crate::services::registry::GameRegistry;
use crate::transport::Transport;
use crate::utils::websocket::PlayerHub;

#[derive(Clone)]
pub struct AppState {
    pub registry: GameRegistry,
    pub hub: PlayerHub,
    pub config_store: Arc<dyn ConfigStore>,
    pub server_config: Arc<ServerConfig>,
}

impl AppState {
    /// State backed by JSON config files under `server_config.config_dir`.
    pub fn new(server_config: ServerConfig) -> Self {
        let store = JsonConfigStore::new(server_config.config_dir.clone());
        Self::with_store(server_config, Arc::new(store))
    }

    pub fn with_store(server_config: ServerConfig, config_store: Arc<dyn ConfigStore>) -> Self {
        AppState {
            registry: GameRegistry::new(),
            hub: PlayerHub::new(),
            config_store,
            server_config: Arc::new(server_config),
        }
    }

    /// In-memory state for tests.
    pub fn in_memory() -> Self {
        Self::with_store(ServerConfig::from_env(), Arc::new(MemoryConfigStore::new()))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.hub.clone())
    }
}
