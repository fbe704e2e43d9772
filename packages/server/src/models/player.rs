use serde::{Deserialize, Serialize};
use std::fmt;

use super::role::{RoleKind, Team};
use super::vote::Choice;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<RoleKind>,
    pub is_dead: bool,
    // last ballot of the current phase
    pub target: Option<Choice>,
    pub confirmed: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            is_dead: false,
            target: None,
            confirmed: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn team(&self) -> Option<Team> {
        self.role.map(RoleKind::team)
    }

    pub fn is_wolf(&self) -> bool {
        self.team() == Some(Team::Wolves)
    }

    pub fn reset_ballot(&mut self) {
        self.target = None;
        self.confirmed = false;
    }
}
