use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::config_store::ConfigStore;
use super::game_engine::{EngineSettings, GameEngine};
use crate::error::GameError;
use crate::models::{
    game::{ChannelId, CommunityId, Game, GameId, GameStatus},
    player::PlayerId,
};
use crate::transport::Transport;

enum GameSlot {
    Lobby(Game),
    Running {
        status: watch::Receiver<GameStatus>,
        handle: JoinHandle<()>,
    },
}

/// Every lobby and running game of the process. A running game's state
/// lives in its engine task; the registry only keeps the handle and a
/// status feed. Lobbies stay until they are started or ended; a running game
/// removes itself when its engine returns.
#[derive(Clone, Default)]
pub struct GameRegistry {
    games: Arc<Mutex<HashMap<GameId, GameSlot>>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a lobby with the host as its first player.
    pub async fn create_game(
        &self,
        community: CommunityId,
        channel: ChannelId,
        host: PlayerId,
        host_name: String,
    ) -> Result<GameId, GameError> {
        let mut game = Game::new(community, channel);
        game.add_player(host, host_name)?;
        let id = game.id;
        self.games.lock().await.insert(id, GameSlot::Lobby(game));
        info!("Created game {} in community {}", id, community);
        Ok(id)
    }

    pub async fn join_game(
        &self,
        game_id: GameId,
        player: PlayerId,
        name: String,
    ) -> Result<usize, GameError> {
        let mut games = self.games.lock().await;
        match games.get_mut(&game_id) {
            Some(GameSlot::Lobby(game)) => game.add_player(player, name),
            Some(GameSlot::Running { .. }) => Err(GameError::AlreadyStarted),
            None => Err(GameError::GameNotFound(game_id)),
        }
    }

    /// Assigns roles and hands the game to its own engine task. Failures
    /// leave the lobby as it was.
    pub async fn start_game(
        &self,
        game_id: GameId,
        store: &dyn ConfigStore,
        transport: Arc<dyn Transport>,
        settings: EngineSettings,
    ) -> Result<(), GameError> {
        let community = match self.games.lock().await.get(&game_id) {
            Some(GameSlot::Lobby(game)) => game.community,
            Some(GameSlot::Running { .. }) => return Err(GameError::AlreadyStarted),
            None => return Err(GameError::GameNotFound(game_id)),
        };
        let config = store.load(community).await;

        let mut games = self.games.lock().await;
        let game = match games.remove(&game_id) {
            Some(GameSlot::Lobby(game)) => game,
            Some(running) => {
                games.insert(game_id, running);
                return Err(GameError::AlreadyStarted);
            }
            None => return Err(GameError::GameNotFound(game_id)),
        };

        let mut engine = GameEngine::new(game, transport, settings);
        if let Err(e) = engine.begin(config) {
            games.insert(game_id, GameSlot::Lobby(engine.into_game()));
            return Err(e);
        }

        let status = engine.subscribe();
        let registry = self.clone();
        let handle = tokio::spawn(async move {
            let result = engine.play().await;
            info!("Game {} finished: {:?}", game_id, result);
            registry.games.lock().await.remove(&game_id);
        });
        games.insert(game_id, GameSlot::Running { status, handle });
        Ok(())
    }

    pub async fn status(&self, game_id: GameId) -> Result<GameStatus, GameError> {
        match self.games.lock().await.get(&game_id) {
            Some(GameSlot::Lobby(game)) => Ok(game.status()),
            Some(GameSlot::Running { status, .. }) => Ok(status.borrow().clone()),
            None => Err(GameError::GameNotFound(game_id)),
        }
    }

    /// Drops a lobby or aborts a running game.
    pub async fn end_game(&self, game_id: GameId) -> Result<(), GameError> {
        match self.games.lock().await.remove(&game_id) {
            Some(GameSlot::Lobby(_)) => {
                info!("Closed lobby {}", game_id);
                Ok(())
            }
            Some(GameSlot::Running { handle, .. }) => {
                warn!("Aborting running game {}", game_id);
                handle.abort();
                Ok(())
            }
            None => Err(GameError::GameNotFound(game_id)),
        }
    }

    pub async fn contains(&self, game_id: GameId) -> bool {
        self.games.lock().await.contains_key(&game_id)
    }
}
