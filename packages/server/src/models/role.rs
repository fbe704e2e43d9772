use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

pub const CHANCE: &str = "chance";
pub const COUNT: &str = "count";
pub const CAN_SKIP_VOTE: &str = "can_skip_vote";
pub const DEAD_SEE_ROLES: &str = "dead_see_roles";

/// Upper bound for a role's `count`.
pub const MAX_COUNT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    Village,
    Wolves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleKind {
    Villager,
    Seer,
    Medic,
    Werewolf,
}

/// Every playable role, keyed by the name used in community configs.
pub const ROLE_REGISTRY: [(&str, RoleKind); 4] = [
    ("Villager", RoleKind::Villager),
    ("Seer", RoleKind::Seer),
    ("Medic", RoleKind::Medic),
    ("Werewolf", RoleKind::Werewolf),
];

impl RoleKind {
    pub fn from_name(name: &str) -> Option<Self> {
        ROLE_REGISTRY
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, kind)| *kind)
    }

    pub fn all() -> impl Iterator<Item = RoleKind> {
        ROLE_REGISTRY.iter().map(|(_, kind)| *kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            RoleKind::Villager => "Villager",
            RoleKind::Seer => "Seer",
            RoleKind::Medic => "Medic",
            RoleKind::Werewolf => "Werewolf",
        }
    }

    pub fn team(self) -> Team {
        match self {
            RoleKind::Werewolf => Team::Wolves,
            RoleKind::Villager | RoleKind::Seer | RoleKind::Medic => Team::Village,
        }
    }

    pub fn default_settings(self) -> RoleSettings {
        match self {
            RoleKind::Villager => RoleSettings::new(0, 1)
                .with_flag(CAN_SKIP_VOTE, 1)
                .with_flag(DEAD_SEE_ROLES, 1),
            RoleKind::Seer | RoleKind::Medic => RoleSettings::new(50, 1),
            RoleKind::Werewolf => RoleSettings::new(100, 1).with_flag(CAN_SKIP_VOTE, 1),
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Village => write!(f, "Village"),
            Team::Wolves => write!(f, "Wolves"),
        }
    }
}

/// Per-role draw parameters plus role specific flags, stored flat:
/// `{"chance": 50, "count": 1, "can_skip_vote": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSettings {
    pub chance: u32,
    pub count: u32,
    #[serde(flatten)]
    pub flags: BTreeMap<String, i64>,
}

impl RoleSettings {
    pub fn new(chance: u32, count: u32) -> Self {
        Self {
            chance,
            count,
            flags: BTreeMap::new(),
        }
    }

    pub fn with_flag(mut self, name: &str, value: i64) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).map(|value| *value != 0)
    }

    pub fn get(&self, parameter: &str) -> Option<i64> {
        match parameter {
            CHANCE => Some(i64::from(self.chance)),
            COUNT => Some(i64::from(self.count)),
            flag => self.flags.get(flag).copied(),
        }
    }

    pub fn set(&mut self, role: &str, parameter: &str, value: i64) -> Result<(), ConfigError> {
        match parameter {
            CHANCE => {
                if !(0..=100).contains(&value) {
                    return Err(ConfigError::InvalidChance {
                        role: role.to_string(),
                        value,
                    });
                }
                self.chance = value as u32;
            }
            COUNT => {
                if !(0..=i64::from(MAX_COUNT)).contains(&value) {
                    return Err(ConfigError::InvalidCount {
                        role: role.to_string(),
                        value,
                    });
                }
                self.count = value as u32;
            }
            flag => match self.flags.get_mut(flag) {
                Some(slot) => *slot = value,
                None => {
                    return Err(ConfigError::UnknownParameter {
                        role: role.to_string(),
                        parameter: flag.to_string(),
                    })
                }
            },
        }
        Ok(())
    }

    pub fn parameters(&self) -> Vec<String> {
        let mut names = vec![CHANCE.to_string(), COUNT.to_string()];
        names.extend(self.flags.keys().cloned());
        names
    }
}
