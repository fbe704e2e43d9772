pub mod config;
pub mod game;
pub mod notice;
pub mod player;
pub mod role;
pub mod vote;
