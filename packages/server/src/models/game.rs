use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use super::config::GameConfig;
use super::notice::RoleLine;
use super::player::{Player, PlayerId};
use super::vote::Choice;
use crate::error::GameError;

pub type CommunityId = u64;
pub type ChannelId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    Night,
    Day,
    Ended,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    VillageWin,
    WolvesWin,
    // nobody took part in a day vote
    Abandoned,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub community: CommunityId,
    pub channel: ChannelId,
    pub players: BTreeMap<PlayerId, Player>,
    pub phase: GamePhase,
    pub round: u32,
    pub result: GameResult,
    pub config: GameConfig,
    // victim -> reason shown to the victim
    pub pending_kills: BTreeMap<PlayerId, String>,
    pub protected: BTreeSet<PlayerId>,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game {{ id: {}, community: {}, players: {}, alive: {}, phase: {:?}, round: {}, result: {:?} }}",
            self.id,
            self.community,
            self.players.len(),
            self.living().count(),
            self.phase,
            self.round,
            self.result
        )
    }
}

impl Game {
    pub fn new(community: CommunityId, channel: ChannelId) -> Self {
        Game {
            id: GameId::new(),
            community,
            channel,
            players: BTreeMap::new(),
            phase: GamePhase::Lobby,
            round: 0,
            result: GameResult::InProgress,
            config: GameConfig::default(),
            pending_kills: BTreeMap::new(),
            protected: BTreeSet::new(),
        }
    }

    /// Adds a player to the lobby and returns the new head count.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<usize, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.contains_key(&id) {
            return Err(GameError::AlreadyJoined);
        }
        self.players.insert(id, Player::new(id, name));
        Ok(self.players.len())
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(&id).ok_or(GameError::UnknownPlayer(id))
    }

    pub fn name_of(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    pub fn living_ids(&self) -> Vec<PlayerId> {
        self.living().map(|p| p.id).collect()
    }

    pub fn reset_ballots(&mut self) {
        self.players.values_mut().for_each(Player::reset_ballot);
    }

    pub fn record_ballots(&mut self, ballots: &BTreeMap<PlayerId, Option<Choice>>) {
        for (voter, choice) in ballots {
            if let Some(player) = self.players.get_mut(voter) {
                player.target = *choice;
                player.confirmed = true;
            }
        }
    }

    pub fn queue_kill(&mut self, target: PlayerId, reason: String) {
        self.pending_kills.insert(target, reason);
    }

    pub fn protect(&mut self, target: PlayerId) {
        self.protected.insert(target);
    }

    /// Applies queued kills, sparing protected players, and returns who
    /// died with their reason. Queue and protections are cleared either way.
    pub fn resolve_kills(&mut self) -> Vec<(PlayerId, String)> {
        let pending = std::mem::take(&mut self.pending_kills);
        let protected = std::mem::take(&mut self.protected);

        let mut deaths = Vec::new();
        for (target, reason) in pending {
            if protected.contains(&target) {
                continue;
            }
            if let Some(player) = self.players.get_mut(&target) {
                if player.is_alive() {
                    player.is_dead = true;
                    deaths.push((target, reason));
                }
            }
        }
        deaths
    }

    /// Village wins once no wolf is alive; wolves win once they are at least
    /// as many as everyone else still alive.
    pub fn winner(&self) -> GameResult {
        let (wolves, others) = self
            .living()
            .fold((0usize, 0usize), |(wolves, others), player| {
                if player.is_wolf() {
                    (wolves + 1, others)
                } else {
                    (wolves, others + 1)
                }
            });
        if wolves == 0 {
            GameResult::VillageWin
        } else if wolves >= others {
            GameResult::WolvesWin
        } else {
            GameResult::InProgress
        }
    }

    pub fn role_lines(&self) -> Vec<RoleLine> {
        self.players
            .values()
            .filter_map(|p| {
                p.role.map(|role| RoleLine {
                    name: p.name.clone(),
                    role,
                    alive: p.is_alive(),
                })
            })
            .collect()
    }

    pub fn status(&self) -> GameStatus {
        GameStatus {
            game_id: self.id,
            phase: self.phase,
            round: self.round,
            result: self.result,
            players: self
                .players
                .values()
                .map(|p| PlayerStatus {
                    id: p.id,
                    name: p.name.clone(),
                    alive: p.is_alive(),
                })
                .collect(),
        }
    }
}

/// Public snapshot of a game; never carries roles or ballots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub game_id: GameId,
    pub phase: GamePhase,
    pub round: u32,
    pub result: GameResult,
    pub players: Vec<PlayerStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::RoleKind;

    fn game_with(roles: &[RoleKind]) -> Game {
        let mut game = Game::new(1, 1);
        for (i, role) in roles.iter().enumerate() {
            let id = PlayerId(i as u64 + 1);
            game.add_player(id, format!("Player{}", i + 1)).unwrap();
            game.players.get_mut(&id).unwrap().role = Some(*role);
        }
        game
    }

    #[test]
    fn lobby_rejects_duplicates_and_late_joins() {
        let mut game = Game::new(1, 1);
        assert_eq!(game.add_player(PlayerId(1), "A".into()).unwrap(), 1);
        assert!(matches!(
            game.add_player(PlayerId(1), "A".into()),
            Err(GameError::AlreadyJoined)
        ));
        game.phase = GamePhase::Night;
        assert!(matches!(
            game.add_player(PlayerId(2), "B".into()),
            Err(GameError::AlreadyStarted)
        ));
    }

    #[test]
    fn protection_blocks_a_queued_kill() {
        let mut game = game_with(&[RoleKind::Werewolf, RoleKind::Medic, RoleKind::Villager]);
        game.queue_kill(PlayerId(3), "eaten".into());
        game.protect(PlayerId(3));

        assert!(game.resolve_kills().is_empty());
        assert!(game.players[&PlayerId(3)].is_alive());
        assert!(game.pending_kills.is_empty());
        assert!(game.protected.is_empty());
    }

    #[test]
    fn unprotected_kill_marks_player_dead() {
        let mut game = game_with(&[RoleKind::Werewolf, RoleKind::Medic, RoleKind::Villager]);
        game.queue_kill(PlayerId(3), "eaten".into());
        game.protect(PlayerId(2));

        let deaths = game.resolve_kills();
        assert_eq!(deaths, vec![(PlayerId(3), "eaten".to_string())]);
        assert!(game.players[&PlayerId(3)].is_dead);
        assert_eq!(game.living().count(), 2);
    }

    #[test]
    fn winner_follows_living_team_counts() {
        let mut game = game_with(&[
            RoleKind::Werewolf,
            RoleKind::Villager,
            RoleKind::Villager,
            RoleKind::Seer,
        ]);
        assert_eq!(game.winner(), GameResult::InProgress);

        game.players.get_mut(&PlayerId(2)).unwrap().is_dead = true;
        assert_eq!(game.winner(), GameResult::InProgress);

        game.players.get_mut(&PlayerId(3)).unwrap().is_dead = true;
        assert_eq!(game.winner(), GameResult::WolvesWin);

        game.players.get_mut(&PlayerId(1)).unwrap().is_dead = true;
        assert_eq!(game.winner(), GameResult::VillageWin);
    }

    #[test]
    fn status_hides_roles() {
        let game = game_with(&[RoleKind::Werewolf, RoleKind::Villager]);
        let json = serde_json::to_string(&game.status()).unwrap();
        assert!(!json.contains("Werewolf"));
        assert_eq!(game.status().players.len(), 2);
    }
}
