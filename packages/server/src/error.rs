use thiserror::Error;

use crate::models::{game::GameId, player::PlayerId};

/// Rejections raised while reading, writing or applying a role configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown role {0}")]
    UnknownRole(String),
    #[error("Unknown parameter {parameter} for role {role}")]
    UnknownParameter { role: String, parameter: String },
    #[error("Chance for {role} must be between 0 and 100, got {value}")]
    InvalidChance { role: String, value: i64 },
    #[error("Count for {role} must be between 0 and {}, got {value}", crate::models::role::MAX_COUNT)]
    InvalidCount { role: String, value: i64 },
    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Game has already started")]
    AlreadyStarted,
    #[error("Could not find game {0}")]
    GameNotFound(GameId),
    #[error("Player {0} is not part of this game")]
    UnknownPlayer(PlayerId),
    #[error("Already in game")]
    AlreadyJoined,
    #[error("A game needs at least one player")]
    NotEnoughPlayers,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Input that a voting session refuses. The session keeps running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoteInputError {
    #[error("Please select an option")]
    NoSelection,
    #[error("This vote cannot be skipped")]
    SkipNotAllowed,
    #[error("That option is not part of this vote")]
    InvalidOption,
    #[error("You are not a voter in this vote")]
    UnknownVoter,
    #[error("This vote is no longer open")]
    SessionNotFound,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Could not deliver message to player {0}")]
    Undeliverable(PlayerId),
    #[error("Transport is closed")]
    Closed,
}
