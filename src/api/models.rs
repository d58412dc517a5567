//! Request and response models
//!
//! Wire shapes for every endpoint. Amounts are whole credits; multipliers
//! are decimals rendered from the integer representations the games use
//! internally.

use serde::{Deserialize, Serialize};

use crate::games::blackjack::{Card, PlayerAction};
use crate::games::plinko::Risk;
use crate::store::{GameRecord, PlayerStats};

// Crash

#[derive(Debug, Deserialize)]
pub struct CrashBetRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct CrashBetResponse {
    pub success: bool,
    pub amount: u64,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct CrashCashoutResponse {
    pub success: bool,
    pub multiplier: f64,
    pub win_amount: u64,
    pub profit: u64,
    pub balance: u64,
}

/// Combined viewer snapshot and caller's own bet
#[derive(Debug, Serialize)]
pub struct CrashStateResponse {
    pub phase: &'static str,
    pub countdown: Option<u32>,
    pub multiplier: f64,
    pub history: Vec<f64>,
    pub active_bets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_bet: Option<crate::crash::MyBet>,
}

// Slots

#[derive(Debug, Deserialize)]
pub struct SlotsSpinRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct SlotsSpinResponse {
    pub success: bool,
    pub reels: [usize; 3],
    pub symbols: [&'static str; 3],
    pub win_type: crate::games::slots::SpinKind,
    pub multiplier: f64,
    pub win_amount: u64,
    pub profit: i64,
    pub balance: u64,
}

// Dice

#[derive(Debug, Deserialize)]
pub struct DiceRollRequest {
    pub amount: u64,
    pub target: u32,
    pub roll_over: bool,
}

#[derive(Debug, Serialize)]
pub struct DiceRollResponse {
    pub success: bool,
    pub roll: f64,
    pub target: u32,
    pub roll_over: bool,
    pub win: bool,
    pub multiplier: f64,
    pub win_amount: u64,
    pub profit: i64,
    pub balance: u64,
}

// Plinko

#[derive(Debug, Deserialize)]
pub struct PlinkoDropRequest {
    pub amount: u64,
    pub risk: Risk,
    pub rows: u32,
}

#[derive(Debug, Serialize)]
pub struct PlinkoDropResponse {
    pub success: bool,
    pub final_index: usize,
    pub multiplier: f64,
    pub win_amount: u64,
    pub profit: i64,
    pub balance: u64,
}

// Blackjack

#[derive(Debug, Deserialize)]
pub struct BlackjackStartRequest {
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct BlackjackActionRequest {
    pub action: PlayerAction,
    /// Serialized table state from the previous response
    pub state: String,
    /// Server signature over `state`
    pub state_sig: String,
}

/// One blackjack response shape for deal, hit, and stand. While the hand
/// is live the dealer shows one card and a signed state rides along; once
/// finished the full dealer hand and the settlement are filled in.
#[derive(Debug, Serialize)]
pub struct BlackjackResponse {
    pub success: bool,
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
    pub player_value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_value: Option<u32>,
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_sig: Option<String>,
}

// Account

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: PlayerStats,
    pub recent_games: Vec<GameRecord>,
}

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
}
