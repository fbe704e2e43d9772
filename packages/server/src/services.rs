pub mod config_store;
pub mod game_engine;
pub mod night_action;
pub mod registry;
pub mod role_catalog;
pub mod voting;
