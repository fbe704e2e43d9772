use async_trait::async_trait;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ConfigError;
use crate::models::{config::GameConfig, game::CommunityId};

/// An in-place change applied by [`ConfigStore::update`].
pub type ConfigEdit<'a> = Box<dyn FnOnce(&mut GameConfig) -> Result<(), ConfigError> + Send + 'a>;

/// Per-community role configuration persistence.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Never fails: a missing or unreadable config is replaced by the
    /// defaults of every registered role, which are saved back.
    async fn load(&self, community: CommunityId) -> GameConfig;

    async fn save(&self, community: CommunityId, config: &GameConfig) -> Result<(), ConfigError>;

    /// Load, edit and save as one step; concurrent updates of a community
    /// never overwrite each other. Nothing is saved when `edit` fails.
    async fn update(
        &self,
        community: CommunityId,
        edit: ConfigEdit<'_>,
    ) -> Result<GameConfig, ConfigError>;
}

/// One pretty printed JSON file per community: `{dir}/{community}.json`.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    dir: PathBuf,
    // serializes every write to the directory
    writes: Arc<Mutex<()>>,
}

impl JsonConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn path_for(&self, community: CommunityId) -> PathBuf {
        self.dir.join(format!("{}.json", community))
    }

    async fn read(&self, community: CommunityId) -> Result<GameConfig, ConfigError> {
        let raw = tokio::fs::read_to_string(self.path_for(community)).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write(&self, community: CommunityId, config: &GameConfig) -> Result<(), ConfigError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let encoded = serde_json::to_string_pretty(config)?;
        tokio::fs::write(self.path_for(community), encoded).await?;
        info!("Saved config for community {}", community);
        Ok(())
    }

    // callers hold `writes`
    async fn load_locked(&self, community: CommunityId) -> GameConfig {
        match self.read(community).await {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Config for community {} unusable ({}), regenerating defaults",
                    community, e
                );
                let defaults = GameConfig::defaults();
                if let Err(e) = self.write(community, &defaults).await {
                    warn!("Failed to save default config for {}: {}", community, e);
                }
                defaults
            }
        }
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn load(&self, community: CommunityId) -> GameConfig {
        let _writes = self.writes.lock().await;
        self.load_locked(community).await
    }

    async fn save(&self, community: CommunityId, config: &GameConfig) -> Result<(), ConfigError> {
        let _writes = self.writes.lock().await;
        self.write(community, config).await
    }

    async fn update(
        &self,
        community: CommunityId,
        edit: ConfigEdit<'_>,
    ) -> Result<GameConfig, ConfigError> {
        let _writes = self.writes.lock().await;
        let mut config = self.load_locked(community).await;
        edit(&mut config)?;
        self.write(community, &config).await?;
        Ok(config)
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    configs: Mutex<HashMap<CommunityId, GameConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, community: CommunityId) -> GameConfig {
        self.configs
            .lock()
            .await
            .entry(community)
            .or_insert_with(GameConfig::defaults)
            .clone()
    }

    async fn save(&self, community: CommunityId, config: &GameConfig) -> Result<(), ConfigError> {
        self.configs.lock().await.insert(community, config.clone());
        Ok(())
    }

    async fn update(
        &self,
        community: CommunityId,
        edit: ConfigEdit<'_>,
    ) -> Result<GameConfig, ConfigError> {
        let mut configs = self.configs.lock().await;
        let mut config = configs
            .entry(community)
            .or_insert_with(GameConfig::defaults)
            .clone();
        edit(&mut config)?;
        configs.insert(community, config.clone());
        Ok(config)
    }
}

pub async fn get_parameter(
    store: &dyn ConfigStore,
    community: CommunityId,
    role: &str,
    parameter: &str,
) -> Result<i64, ConfigError> {
    store.load(community).await.get_parameter(role, parameter)
}

/// Validates and persists one parameter change.
pub async fn set_parameter(
    store: &dyn ConfigStore,
    community: CommunityId,
    role: &str,
    parameter: &str,
    value: i64,
) -> Result<(), ConfigError> {
    store
        .update(
            community,
            Box::new(move |config: &mut GameConfig| {
                config.set_parameter(role, parameter, value)
            }),
        )
        .await?;
    info!(
        "Community {}: {} {} set to {}",
        community, role, parameter, value
    );
    Ok(())
}

/// Parameter names of one role, for listing.
pub async fn list_parameters(
    store: &dyn ConfigStore,
    community: CommunityId,
    role: &str,
) -> Result<Vec<String>, ConfigError> {
    store.load(community).await.parameters(role)
}
