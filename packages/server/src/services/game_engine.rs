use futures::future::join_all;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::night_action::{assign_action, night_action, NightEffect};
use super::role_catalog::{assign_roles, materialize_roles};
use super::voting::{VoteSettings, VotingSession};
use crate::error::GameError;
use crate::models::{
    config::GameConfig,
    game::{Game, GamePhase, GameResult, GameStatus},
    notice::{Notice, NoticeBody},
    player::PlayerId,
    role::{RoleKind, CAN_SKIP_VOTE, DEAD_SEE_ROLES},
    vote::Choice,
};
use crate::transport::{announce, notify, notify_all, Transport};

pub const WOLF_KILL_MESSAGES: [&str; 3] = [
    "You were killed by the wolves",
    "You were torn to shreds by the wolves",
    "You've been eaten by the wolves",
];

pub const EXILE_MESSAGES: [&str; 4] = [
    "You were exiled by the villagers",
    "You were burnt at the stake by the villagers",
    "You were executed by the villagers",
    "Zeph left a note at your door so you decided to leave",
];

pub const WOLF_VOTE_TITLE: &str = "Choose a player to kill";
pub const EXILE_VOTE_TITLE: &str = "Choose a player to exile";
pub const ROLES_ASSIGNED: &str = "Roles assigned, check your private messages";
pub const NO_ONE_KILLED: &str = "No one was killed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pause between the role reveal and the first night.
    pub start_delay: Duration,
    pub vote_timeout: Option<Duration>,
    pub seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(5),
            vote_timeout: None,
            seed: None,
        }
    }
}

/// Drives one game from the lobby to a result. The engine is the only
/// writer of its `Game`; everything else observes it through [`subscribe`].
///
/// [`subscribe`]: GameEngine::subscribe
pub struct GameEngine {
    game: Game,
    transport: Arc<dyn Transport>,
    settings: EngineSettings,
    rng: StdRng,
    status: watch::Sender<GameStatus>,
}

impl GameEngine {
    pub fn new(game: Game, transport: Arc<dyn Transport>, settings: EngineSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (status, _) = watch::channel(game.status());
        Self {
            game,
            transport,
            settings,
            rng,
            status,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn into_game(self) -> Game {
        self.game
    }

    pub fn subscribe(&self) -> watch::Receiver<GameStatus> {
        self.status.subscribe()
    }

    pub async fn start(&mut self, config: GameConfig) -> Result<GameResult, GameError> {
        self.begin(config)?;
        Ok(self.play().await)
    }

    /// Lobby checks and role assignment. Nothing is sent to players yet.
    pub fn begin(&mut self, config: GameConfig) -> Result<(), GameError> {
        if self.game.phase != GamePhase::Lobby {
            return Err(GameError::AlreadyStarted);
        }
        if self.game.players.is_empty() {
            return Err(GameError::NotEnoughPlayers);
        }

        let roles = materialize_roles(&config, self.game.players.len(), &mut self.rng)?;
        assign_roles(&mut self.game.players, roles, &mut self.rng);
        self.game.config = config;
        self.game.phase = GamePhase::Night;
        info!("Game {} started with {} players", self.game.id, self.game.players.len());
        self.publish();
        Ok(())
    }

    /// Reveals roles and runs night/day rounds until a team wins.
    pub async fn play(&mut self) -> GameResult {
        if matches!(self.game.phase, GamePhase::Lobby | GamePhase::Ended) {
            warn!("Game {} is not running ({:?})", self.game.id, self.game.phase);
            return self.game.result;
        }

        self.reveal_roles().await;
        announce(
            self.transport.as_ref(),
            self.game.channel,
            Notice::text(ROLES_ASSIGNED),
        )
        .await;
        if !self.settings.start_delay.is_zero() {
            tokio::time::sleep(self.settings.start_delay).await;
        }

        // degenerate rosters (a lone wolf) end before the first night
        if let Some(result) = self.win_check().await {
            return result;
        }
        loop {
            self.night_phase().await;
            if let Some(result) = self.win_check().await {
                return result;
            }
            let answered = self.day_phase().await;
            if let Some(result) = self.win_check().await {
                return result;
            }
            if !answered {
                warn!("Nobody voted in game {}, abandoning it", self.game.id);
                self.finish(GameResult::Abandoned).await;
                return GameResult::Abandoned;
            }
        }
    }

    async fn reveal_roles(&self) {
        let transport = self.transport.as_ref();
        join_all(self.game.players.values().filter_map(|player| {
            assign_action(player, &self.game).map(|notice| notify(transport, player.id, notice))
        }))
        .await;
    }

    /// Wolf vote and every private night action run side by side; their
    /// effects are applied once all of them are done.
    pub async fn night_phase(&mut self) {
        self.game.phase = GamePhase::Night;
        self.game.round += 1;
        self.game.reset_ballots();
        self.publish();
        info!("Game {}: night {}", self.game.id, self.game.round);

        let transport = Arc::clone(&self.transport);
        let timeout = self.settings.vote_timeout;
        let (wolf_result, outcomes) = {
            let game = &self.game;
            let settings = VoteSettings::new()
                .live_update(true)
                .skippable(game.config.flag(RoleKind::Werewolf, CAN_SKIP_VOTE))
                .timeout(timeout);
            let wolf_vote = VotingSession::new(
                WOLF_VOTE_TITLE,
                game.living().filter(|p| p.is_wolf()),
                game.living().filter(|p| !p.is_wolf()),
                settings,
            );
            let actions = join_all(
                game.living()
                    .map(|player| night_action(player, game, transport.as_ref(), timeout)),
            );
            tokio::join!(wolf_vote.run(transport.as_ref()), actions)
        };

        self.game.record_ballots(&wolf_result.ballots);
        let picks: BTreeMap<PlayerId, Option<Choice>> = outcomes
            .iter()
            .filter(|outcome| outcome.ballot.is_some())
            .map(|outcome| (outcome.actor, outcome.ballot))
            .collect();
        self.game.record_ballots(&picks);
        for outcome in outcomes {
            if let NightEffect::Protect(target) = outcome.effect {
                debug!("Player {} is protected tonight", target);
                self.game.protect(target);
            }
        }
        if let Some(victim) = wolf_result.outcome.winner() {
            let reason = self.pick_message(&WOLF_KILL_MESSAGES);
            self.game.queue_kill(victim, reason);
        }
        self.apply_kills("was killed").await;
    }

    /// Runs the exile vote. Returns false when no living player answered.
    pub async fn day_phase(&mut self) -> bool {
        self.game.phase = GamePhase::Day;
        self.game.reset_ballots();
        self.publish();
        info!("Game {}: day {}", self.game.id, self.game.round);

        let transport = Arc::clone(&self.transport);
        let settings = VoteSettings::new()
            .live_update(true)
            .skippable(self.game.config.flag(RoleKind::Villager, CAN_SKIP_VOTE))
            .timeout(self.settings.vote_timeout);
        let result = VotingSession::new(
            EXILE_VOTE_TITLE,
            self.game.living(),
            self.game.living(),
            settings,
        )
        .run(transport.as_ref())
        .await;

        self.game.record_ballots(&result.ballots);
        match result.outcome.winner() {
            Some(exiled) => {
                let reason = self.pick_message(&EXILE_MESSAGES);
                self.game.queue_kill(exiled, reason);
            }
            None => {
                notify_all(
                    transport.as_ref(),
                    self.game.living_ids(),
                    Notice::text(NO_ONE_KILLED),
                )
                .await
            }
        }
        self.apply_kills("was voted out").await;
        result.had_response()
    }

    async fn apply_kills(&mut self, verb: &str) {
        let transport = Arc::clone(&self.transport);
        let deaths = self.game.resolve_kills();
        let show_roles = self.game.config.flag(RoleKind::Villager, DEAD_SEE_ROLES);

        for (victim, reason) in deaths {
            let name = self.game.name_of(victim);
            info!("Game {}: {} {}", self.game.id, name, verb);
            notify(
                transport.as_ref(),
                victim,
                Notice::new(NoticeBody::Killed { reason }),
            )
            .await;
            if show_roles {
                let roles = self.game.role_lines();
                notify(
                    transport.as_ref(),
                    victim,
                    Notice::new(NoticeBody::RoleList { roles }),
                )
                .await;
            }
            notify_all(
                transport.as_ref(),
                self.game.living_ids(),
                Notice::text(format!("{} {}", name, verb)),
            )
            .await;
        }
        self.publish();
    }

    /// Ends the game once a team has won and tells everyone.
    pub async fn win_check(&mut self) -> Option<GameResult> {
        let result = self.game.winner();
        if result == GameResult::InProgress {
            return None;
        }
        self.finish(result).await;
        Some(result)
    }

    async fn finish(&mut self, result: GameResult) {
        self.game.result = result;
        self.game.phase = GamePhase::Ended;
        self.publish();
        info!("Game {} ended: {:?}", self.game.id, result);

        let transport = self.transport.as_ref();
        let notice = Notice::new(NoticeBody::GameOver { result });
        announce(transport, self.game.channel, notice.clone()).await;
        let everyone: Vec<PlayerId> = self.game.players.keys().copied().collect();
        notify_all(transport, everyone, notice).await;
    }

    fn pick_message(&mut self, pool: &[&str]) -> String {
        pool.choose(&mut self.rng)
            .map(|message| message.to_string())
            .unwrap_or_default()
    }

    fn publish(&self) {
        self.status.send_replace(self.game.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::RoleSettings;
    use crate::utils::test_transport::ScriptedTransport;

    fn engine_for(names: &[&str]) -> (GameEngine, ScriptedTransport) {
        let transport = ScriptedTransport::new(|_| vec![]);
        let mut game = Game::new(10, 20);
        for (i, name) in names.iter().enumerate() {
            game.add_player(PlayerId(i as u64 + 1), name.to_string())
                .unwrap();
        }
        let settings = EngineSettings {
            start_delay: Duration::ZERO,
            vote_timeout: None,
            seed: Some(1),
        };
        let engine = GameEngine::new(game, Arc::new(transport.clone()), settings);
        (engine, transport)
    }

    #[test]
    fn empty_lobby_cannot_start() {
        let (mut engine, _) = engine_for(&[]);
        assert!(matches!(
            engine.begin(GameConfig::defaults()),
            Err(GameError::NotEnoughPlayers)
        ));
        assert_eq!(engine.game().phase, GamePhase::Lobby);
    }

    #[test]
    fn second_begin_is_rejected() {
        let (mut engine, _) = engine_for(&["A", "B", "C"]);
        engine.begin(GameConfig::defaults()).unwrap();
        assert!(matches!(
            engine.begin(GameConfig::defaults()),
            Err(GameError::AlreadyStarted)
        ));
        assert!(engine.game().players.values().all(|p| p.role.is_some()));
    }

    #[test]
    fn invalid_config_leaves_the_lobby_untouched() {
        let (mut engine, _) = engine_for(&["A", "B"]);
        let mut config = GameConfig::defaults();
        config
            .roles
            .insert("Ghost".to_string(), RoleSettings::new(50, 1));

        assert!(matches!(engine.begin(config), Err(GameError::Config(_))));
        assert_eq!(engine.game().phase, GamePhase::Lobby);
        assert!(engine.game().players.values().all(|p| p.role.is_none()));
    }

    #[tokio::test]
    async fn lone_wolf_wins_without_a_night() {
        let (mut engine, transport) = engine_for(&["Solo"]);
        let status = engine.subscribe();

        let result = engine.start(GameConfig::defaults()).await.unwrap();
        assert_eq!(result, GameResult::WolvesWin);
        assert_eq!(engine.game().round, 0);
        assert_eq!(status.borrow().phase, GamePhase::Ended);
        assert!(transport.choices().is_empty());
        assert!(transport
            .public_notices()
            .contains(&NoticeBody::GameOver {
                result: GameResult::WolvesWin
            }));
    }

    #[tokio::test]
    async fn play_before_begin_does_nothing() {
        let (mut engine, transport) = engine_for(&["A", "B"]);
        assert_eq!(engine.play().await, GameResult::InProgress);
        assert!(transport.deliveries().is_empty());
    }
}
