use crate::error::{ConfigError, GameError, VoteInputError};
use crate::state::AppState;
use crate::utils::websocket;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

mod config;
mod game;
mod vote;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/game", game::routes(state.clone()))
        .nest("/api/vote", vote::routes(state.clone()))
        .nest("/api/config", config::routes(state.clone()))
        .route(
            "/api/ws/:player_id",
            get(websocket::handler).with_state(state),
        )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn reject(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
}

pub(crate) fn game_rejection(e: GameError) -> ApiError {
    let status = match &e {
        GameError::GameNotFound(_) => StatusCode::NOT_FOUND,
        GameError::AlreadyStarted | GameError::AlreadyJoined => StatusCode::CONFLICT,
        GameError::UnknownPlayer(_) | GameError::NotEnoughPlayers => StatusCode::BAD_REQUEST,
        GameError::Config(config) => config_status(config),
    };
    reject(status, e)
}

pub(crate) fn config_rejection(e: ConfigError) -> ApiError {
    reject(config_status(&e), e)
}

fn config_status(e: &ConfigError) -> StatusCode {
    match e {
        ConfigError::UnknownRole(_) | ConfigError::UnknownParameter { .. } => {
            StatusCode::NOT_FOUND
        }
        ConfigError::InvalidChance { .. } | ConfigError::InvalidCount { .. } => {
            StatusCode::BAD_REQUEST
        }
        ConfigError::Io(_) | ConfigError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn vote_rejection(e: VoteInputError) -> ApiError {
    let status = match e {
        VoteInputError::SessionNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    reject(status, e)
}
