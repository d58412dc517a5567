//! Credit store seam
//!
//! The platform persists balances, game outcomes, and aggregate stats in a
//! relational store owned by the web tier. This module defines the trait the
//! game server talks through, plus an in-memory implementation used for
//! development and tests. Swapping in the real database is a matter of
//! implementing [`Store`] against it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Conflict, GameResult};

/// Which minigame produced a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Crash,
    Slots,
    Dice,
    Plinko,
    Blackjack,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Crash => write!(f, "crash"),
            GameKind::Slots => write!(f, "slots"),
            GameKind::Dice => write!(f, "dice"),
            GameKind::Plinko => write!(f, "plinko"),
            GameKind::Blackjack => write!(f, "blackjack"),
        }
    }
}

/// One finished game for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub user_id: String,
    pub game: GameKind,
    pub bet_amount: u64,
    pub win_amount: u64,
    /// Game-specific outcome details (reels, crash point, hands, ...)
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn new(
        user_id: impl Into<String>,
        game: GameKind,
        bet_amount: u64,
        win_amount: u64,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            game,
            bet_amount,
            win_amount,
            detail,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate per-player statistics, updated on every recorded game
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub total_games: u64,
    pub total_wagered: u64,
    pub total_won: u64,
    pub biggest_win: u64,
    pub xp: u64,
    pub level: u64,
}

impl PlayerStats {
    fn apply(&mut self, record: &GameRecord) {
        self.total_games += 1;
        self.total_wagered += record.bet_amount;
        self.total_won += record.win_amount;
        self.biggest_win = self.biggest_win.max(record.win_amount);
        self.xp += record.bet_amount / 10;
        self.level = self.xp / 100 + 1;
    }
}

/// Persistence interface for balances and game outcomes
#[async_trait]
pub trait Store: Send + Sync {
    /// Current balance, creating the account if it is new.
    async fn balance(&self, user_id: &str) -> GameResult<u64>;

    /// Withdraw credits; fails with `InsufficientFunds` without mutating.
    /// Returns the new balance.
    async fn debit(&self, user_id: &str, amount: u64) -> GameResult<u64>;

    /// Deposit credits; returns the new balance.
    async fn credit(&self, user_id: &str, amount: u64) -> GameResult<u64>;

    /// Persist a finished game and fold it into the player's stats.
    async fn record_game(&self, record: GameRecord) -> GameResult<()>;

    /// Aggregate stats for a player.
    async fn stats(&self, user_id: &str) -> GameResult<PlayerStats>;

    /// Recent games for a player, most recent last.
    async fn recent_games(&self, user_id: &str) -> GameResult<Vec<GameRecord>>;
}

/// Per-user cap on retained game records
const RECORD_CAP: usize = 100;

/// In-memory store backed by concurrent maps. Accounts are created lazily
/// with a configured starting balance.
pub struct MemoryStore {
    starting_credits: u64,
    balances: DashMap<String, u64>,
    stats: DashMap<String, PlayerStats>,
    records: DashMap<String, Vec<GameRecord>>,
}

impl MemoryStore {
    pub fn new(starting_credits: u64) -> Self {
        Self {
            starting_credits,
            balances: DashMap::new(),
            stats: DashMap::new(),
            records: DashMap::new(),
        }
    }

}

#[async_trait]
impl Store for MemoryStore {
    async fn balance(&self, user_id: &str) -> GameResult<u64> {
        Ok(*self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_credits))
    }

    async fn debit(&self, user_id: &str, amount: u64) -> GameResult<u64> {
        let mut balance = self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_credits);
        if *balance < amount {
            return Err(Conflict::InsufficientFunds.into());
        }
        *balance -= amount;
        Ok(*balance)
    }

    async fn credit(&self, user_id: &str, amount: u64) -> GameResult<u64> {
        let mut balance = self
            .balances
            .entry(user_id.to_string())
            .or_insert(self.starting_credits);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    async fn record_game(&self, record: GameRecord) -> GameResult<()> {
        self.stats
            .entry(record.user_id.clone())
            .or_default()
            .apply(&record);

        let mut records = self.records.entry(record.user_id.clone()).or_default();
        records.push(record);
        if records.len() > RECORD_CAP {
            let excess = records.len() - RECORD_CAP;
            records.drain(0..excess);
        }
        Ok(())
    }

    async fn stats(&self, user_id: &str) -> GameResult<PlayerStats> {
        Ok(self
            .stats
            .get(user_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    async fn recent_games(&self, user_id: &str) -> GameResult<Vec<GameRecord>> {
        Ok(self
            .records
            .get(user_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}
