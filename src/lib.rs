//! Croupier - casino minigame backend
//!
//! One shared crash round broadcast to every viewer, plus four
//! single-request games (slots, dice, plinko, blackjack) settled against
//! an in-memory credit store. Players authenticate with HMAC bearer
//! tokens minted by the identity service after the OAuth exchange.

pub mod api;
pub mod auth;
pub mod config;
pub mod crash;
pub mod errors;
pub mod games;
pub mod store;

pub use api::ApiServer;
pub use config::CroupierConfig;
pub use errors::{Conflict, GameError, GameResult};
pub use store::{MemoryStore, Store};
