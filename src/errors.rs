//! Error types for the Croupier game backend
//!
//! One taxonomy for every game operation: user input problems, auth
//! failures, round/bet state conflicts, and persistence failures. The API
//! layer maps these onto HTTP responses; the crash engine additionally
//! isolates persistence failures so a bad write never stalls a round.

use thiserror::Error;

/// Root error type for game operations
#[derive(Debug, Error)]
pub enum GameError {
    /// Malformed or out-of-range user input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Missing or invalid credential
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The operation conflicts with the current round/bet state
    #[error(transparent)]
    StateConflict(#[from] Conflict),

    /// Balance or game-record write failed
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// State conflicts a player can run into; each carries the reason shown
/// back to the player verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("you already have a bet in this round")]
    AlreadyBet,

    #[error("round in progress, wait for the next one")]
    RoundNotAcceptingBets,

    #[error("no active bet")]
    NoActiveBet,

    #[error("bet already cashed out")]
    AlreadyCashedOut,

    #[error("round is not running")]
    RoundNotRunning,

    #[error("insufficient credits")]
    InsufficientFunds,
}

/// Convenience alias for game operation results
pub type GameResult<T> = Result<T, GameError>;
