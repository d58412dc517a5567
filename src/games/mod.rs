//! Single-player minigames
//!
//! Each game is a pure outcome function over a [`UniformSource`]: draw the
//! result, compute the payout, return a serializable outcome. The API
//! layer owns the money movement around it: debit the stake, play, credit
//! any winnings, record the game. Keeping the randomness injected makes
//! every payout branch testable without touching an RNG.

pub mod blackjack;
pub mod dice;
pub mod plinko;
pub mod slots;

use std::sync::Arc;

use tracing::warn;

use crate::errors::{GameError, GameResult};
use crate::store::{GameKind, GameRecord, Store};

/// Credit winnings and record the finished game. Returns the balance
/// after settlement. The stake was debited before the game ran; a failed
/// record is logged and does not claw back the payout.
pub async fn settle_wager(
    store: &Arc<dyn Store>,
    user_id: &str,
    game: GameKind,
    bet_amount: u64,
    win_amount: u64,
    detail: serde_json::Value,
) -> GameResult<u64> {
    let balance = if win_amount > 0 {
        store.credit(user_id, win_amount).await?
    } else {
        store.balance(user_id).await?
    };

    let record = GameRecord::new(user_id, game, bet_amount, win_amount, detail);
    if let Err(err) = store.record_game(record).await {
        warn!(user_id, %game, %err, "failed to record game outcome");
    }
    Ok(balance)
}

/// Shared stake validation for every game endpoint.
pub fn validate_bet(amount: u64) -> GameResult<()> {
    if amount == 0 {
        return Err(GameError::Validation(
            "bet amount must be positive".to_string(),
        ));
    }
    Ok(())
}
