use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::role::{RoleKind, RoleSettings, MAX_COUNT};
use crate::error::ConfigError;
use crate::services::game_engine::EngineSettings;

/// A community's role table: role name -> draw settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameConfig {
    pub roles: BTreeMap<String, RoleSettings>,
}

impl GameConfig {
    /// Defaults of every registered role.
    pub fn defaults() -> Self {
        let roles = RoleKind::all()
            .map(|kind| (kind.name().to_string(), kind.default_settings()))
            .collect();
        Self { roles }
    }

    pub fn with_role(mut self, kind: RoleKind, settings: RoleSettings) -> Self {
        self.roles.insert(kind.name().to_string(), settings);
        self
    }

    /// Checks every entry names a registered role with usable chance and count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, settings) in &self.roles {
            if RoleKind::from_name(name).is_none() {
                return Err(ConfigError::UnknownRole(name.clone()));
            }
            if settings.chance > 100 {
                return Err(ConfigError::InvalidChance {
                    role: name.clone(),
                    value: i64::from(settings.chance),
                });
            }
            if settings.count > MAX_COUNT {
                return Err(ConfigError::InvalidCount {
                    role: name.clone(),
                    value: i64::from(settings.count),
                });
            }
        }
        Ok(())
    }

    /// Role flag, falling back to the role's default when the community
    /// config does not carry it.
    pub fn flag(&self, kind: RoleKind, flag: &str) -> bool {
        self.roles
            .get(kind.name())
            .and_then(|settings| settings.flag(flag))
            .or_else(|| kind.default_settings().flag(flag))
            .unwrap_or(false)
    }

    pub fn get_parameter(&self, role: &str, parameter: &str) -> Result<i64, ConfigError> {
        let settings = self.settings_or_default(role)?;
        settings
            .get(parameter)
            .ok_or_else(|| ConfigError::UnknownParameter {
                role: role.to_string(),
                parameter: parameter.to_string(),
            })
    }

    pub fn set_parameter(
        &mut self,
        role: &str,
        parameter: &str,
        value: i64,
    ) -> Result<(), ConfigError> {
        let mut settings = self.settings_or_default(role)?;
        settings.set(role, parameter, value)?;
        self.roles.insert(role.to_string(), settings);
        Ok(())
    }

    /// Parameter names a role accepts, defaults included.
    pub fn parameters(&self, role: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self.settings_or_default(role)?.parameters())
    }

    fn settings_or_default(&self, role: &str) -> Result<RoleSettings, ConfigError> {
        let kind =
            RoleKind::from_name(role).ok_or_else(|| ConfigError::UnknownRole(role.to_string()))?;
        Ok(self
            .roles
            .get(role)
            .cloned()
            .unwrap_or_else(|| kind.default_settings()))
    }
}

/// Process level settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub config_dir: PathBuf,
    pub allowed_origin: String,
    // None keeps votes open until every voter confirms
    pub vote_timeout: Option<Duration>,
    pub start_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            config_dir: PathBuf::from("configs"),
            allowed_origin: "http://localhost:3000".to_string(),
            vote_timeout: Some(Duration::from_secs(300)),
            start_delay: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("WEREWOLF_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or(defaults.bind_addr);
        let config_dir = env::var("WEREWOLF_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.config_dir);
        let allowed_origin =
            env::var("WEREWOLF_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin);
        let vote_timeout = match env::var("WEREWOLF_VOTE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => defaults.vote_timeout,
        };
        let start_delay = env::var("WEREWOLF_START_DELAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.start_delay);

        Self {
            bind_addr,
            config_dir,
            allowed_origin,
            vote_timeout,
            start_delay,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            start_delay: self.start_delay,
            vote_timeout: self.vote_timeout,
            seed: None,
        }
    }
}
