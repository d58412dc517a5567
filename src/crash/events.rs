//! Broadcast events for the crash game
//!
//! Fan-out only: every event goes to every subscriber, no per-client
//! state. New WebSocket subscribers get a one-time `state` snapshot on
//! connect; after that there is no backfill, viewers ride the stream.

use serde::{Deserialize, Serialize};

use super::distribution::as_decimal;
use super::ledger::Bet;
use super::round::Round;

/// Server -> viewer events, tagged for the client switch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrashEvent {
    /// Countdown tick before launch
    Waiting { countdown: u32 },
    /// Round launched. The crash point stays server-side until the crash.
    Started,
    /// Multiplier tick while running
    Tick { multiplier: f64 },
    /// Round over
    Crashed { crash_point: f64, multiplier: f64 },
    /// A player joined the round
    Bet { user_id: String, total_bets: usize },
    /// A player locked in a payout
    Cashout {
        user_id: String,
        multiplier: f64,
        win_amount: u64,
    },
}

/// One-time snapshot delivered to a viewer on connect
#[derive(Debug, Clone, Serialize)]
pub struct CrashSnapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub phase: &'static str,
    pub countdown: Option<u32>,
    pub multiplier: f64,
    pub history: Vec<f64>,
    pub active_bets: usize,
}

impl CrashSnapshot {
    pub fn new(round: &Round, history: &[u32], active_bets: usize) -> Self {
        Self {
            kind: "state",
            phase: round.phase.as_str(),
            countdown: round.accepts_bets().then_some(round.countdown),
            multiplier: as_decimal(round.multiplier),
            history: history.iter().copied().map(as_decimal).collect(),
            active_bets,
        }
    }
}

/// A player's own bet, as reported by the state endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MyBet {
    pub amount: u64,
    pub cashed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashout_multiplier: Option<f64>,
}

impl From<&Bet> for MyBet {
    fn from(bet: &Bet) -> Self {
        Self {
            amount: bet.stake,
            cashed_out: bet.cashed_out,
            cashout_multiplier: bet.cashout_multiplier.map(as_decimal),
        }
    }
}
