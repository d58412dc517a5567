//! Bet ledger for the current round
//!
//! One entry per user, created during the countdown, mutated at most once
//! by a cashout, and drained when the round crashes. Balances live in the
//! store; the ledger only tracks stakes for the round in flight.

use std::collections::HashMap;

use serde::Serialize;

use crate::errors::{Conflict, GameResult};

/// A single stake in the current round
#[derive(Debug, Clone, Serialize)]
pub struct Bet {
    pub user_id: String,
    /// Stake in whole credits
    pub stake: u64,
    pub cashed_out: bool,
    /// Locked-in multiplier in hundredths, set by a successful cashout
    pub cashout_multiplier: Option<u32>,
}

/// The per-round user -> stake mapping
#[derive(Debug, Default)]
pub struct BetLedger {
    bets: HashMap<String, Bet>,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stake. The caller is responsible for checking the round
    /// phase and withdrawing the stake before calling.
    pub fn place(&mut self, user_id: &str, stake: u64) -> GameResult<()> {
        if self.bets.contains_key(user_id) {
            return Err(Conflict::AlreadyBet.into());
        }
        self.bets.insert(
            user_id.to_string(),
            Bet {
                user_id: user_id.to_string(),
                stake,
                cashed_out: false,
                cashout_multiplier: None,
            },
        );
        Ok(())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.bets.contains_key(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<&Bet> {
        self.bets.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Mark a bet cashed out at the given multiplier, exactly once. Returns
    /// the stake so the caller can compute the payout.
    pub fn cash_out(&mut self, user_id: &str, multiplier: u32) -> GameResult<u64> {
        let bet = self
            .bets
            .get_mut(user_id)
            .ok_or(Conflict::NoActiveBet)?;
        if bet.cashed_out {
            return Err(Conflict::AlreadyCashedOut.into());
        }
        bet.cashed_out = true;
        bet.cashout_multiplier = Some(multiplier);
        Ok(bet.stake)
    }

    /// Drain every bet, handing back the ones that never cashed out. The
    /// ledger is empty afterwards; cashed-out bets were already settled on
    /// their request path.
    pub fn drain_losses(&mut self) -> Vec<Bet> {
        let mut losses: Vec<Bet> = self
            .bets
            .drain()
            .map(|(_, bet)| bet)
            .filter(|bet| !bet.cashed_out)
            .collect();
        losses.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        losses
    }
}
