use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{game_rejection, ApiError, MessageBody};
use crate::models::{
    game::{ChannelId, CommunityId, GameId, GameStatus},
    player::PlayerId,
};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub host: PlayerInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameResponse {
    pub game_id: GameId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinGameResponse {
    pub message: String,
    pub players: usize,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/create", post(create_game))
        .nest(
            "/:game_id",
            Router::new()
                .route("/join", post(join_game))
                .route("/start", post(start_game))
                .route("/state", get(get_game_state))
                .route("/end", post(end_game)),
        )
        .with_state(state)
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, ApiError> {
    let game_id = state
        .registry
        .create_game(
            request.community_id,
            request.channel_id,
            PlayerId(request.host.id),
            request.host.name,
        )
        .await
        .map_err(game_rejection)?;
    Ok(Json(CreateGameResponse { game_id }))
}

pub async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(player): Json<PlayerInfo>,
) -> Result<Json<JoinGameResponse>, ApiError> {
    let players = state
        .registry
        .join_game(game_id, PlayerId(player.id), player.name)
        .await
        .map_err(game_rejection)?;
    Ok(Json(JoinGameResponse {
        message: "Joined".to_string(),
        players,
    }))
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .registry
        .start_game(
            game_id,
            state.config_store.as_ref(),
            state.transport(),
            state.server_config.engine_settings(),
        )
        .await
        .map_err(game_rejection)?;
    Ok(MessageBody::new("Game started"))
}

pub async fn get_game_state(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameStatus>, ApiError> {
    let status = state
        .registry
        .status(game_id)
        .await
        .map_err(game_rejection)?;
    Ok(Json(status))
}

async fn end_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .registry
        .end_game(game_id)
        .await
        .map_err(game_rejection)?;
    Ok(MessageBody::new("Game ended"))
}
