use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::GameResult;
use super::role::{RoleKind, Team};

/// A message delivered to a player or a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub notice_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: NoticeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum NoticeBody {
    Text {
        content: String,
    },
    RoleReveal {
        role: RoleKind,
        team: Team,
        // the whole pack, only filled when there is more than one wolf
        teammates: Vec<String>,
    },
    Killed {
        reason: String,
    },
    RoleList {
        roles: Vec<RoleLine>,
    },
    GameOver {
        result: GameResult,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLine {
    pub name: String,
    pub role: RoleKind,
    pub alive: bool,
}

impl Notice {
    pub fn new(body: NoticeBody) -> Self {
        Notice {
            notice_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NoticeBody::Text {
            content: content.into(),
        })
    }
}
