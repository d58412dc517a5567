//! Plinko board
//!
//! A ball takes one 50/50 step per row, so the landing slot is the count
//! of rightward steps and follows a binomial distribution centred on the
//! middle of the board. Payout tables come per risk level and row count,
//! kept in tenths for integer payouts.

use serde::{Deserialize, Serialize};

use crate::crash::distribution::UniformSource;
use crate::errors::{GameError, GameResult};

/// Payout spread of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// Supported board heights
pub const SUPPORTED_ROWS: [u32; 5] = [8, 10, 12, 14, 16];

// Slot multipliers in tenths, edges out. A board with N rows has N+1 slots.
const LOW_8: &[u64] = &[56, 21, 11, 10, 5, 10, 11, 21, 56];
const LOW_10: &[u64] = &[89, 30, 14, 11, 10, 5, 10, 11, 14, 30, 89];
const LOW_12: &[u64] = &[100, 30, 16, 14, 11, 10, 5, 10, 11, 14, 16, 30, 100];
const LOW_14: &[u64] = &[71, 40, 19, 14, 13, 11, 10, 5, 10, 11, 13, 14, 19, 40, 71];
const LOW_16: &[u64] = &[160, 90, 20, 14, 14, 12, 11, 10, 5, 10, 11, 12, 14, 14, 20, 90, 160];

const MEDIUM_8: &[u64] = &[130, 30, 13, 7, 4, 7, 13, 30, 130];
const MEDIUM_10: &[u64] = &[220, 50, 20, 14, 6, 4, 6, 14, 20, 50, 220];
const MEDIUM_12: &[u64] = &[330, 110, 40, 20, 11, 6, 3, 6, 11, 20, 40, 110, 330];
const MEDIUM_14: &[u64] = &[580, 150, 70, 40, 19, 10, 5, 2, 5, 10, 19, 40, 70, 150, 580];
const MEDIUM_16: &[u64] = &[
    1_100, 410, 100, 50, 30, 15, 10, 5, 3, 5, 10, 15, 30, 50, 100, 410, 1_100,
];

const HIGH_8: &[u64] = &[290, 40, 15, 3, 2, 3, 15, 40, 290];
const HIGH_10: &[u64] = &[430, 70, 20, 6, 2, 2, 2, 6, 20, 70, 430];
const HIGH_12: &[u64] = &[760, 100, 30, 9, 3, 2, 2, 2, 3, 9, 30, 100, 760];
const HIGH_14: &[u64] = &[1_700, 240, 80, 20, 7, 2, 2, 2, 2, 2, 7, 20, 80, 240, 1_700];
const HIGH_16: &[u64] = &[
    4_200, 560, 180, 50, 19, 3, 2, 2, 2, 2, 2, 3, 19, 50, 180, 560, 4_200,
];

/// Multiplier table for a board, or an error for unsupported heights.
pub fn multipliers(risk: Risk, rows: u32) -> GameResult<&'static [u64]> {
    let table = match (risk, rows) {
        (Risk::Low, 8) => LOW_8,
        (Risk::Low, 10) => LOW_10,
        (Risk::Low, 12) => LOW_12,
        (Risk::Low, 14) => LOW_14,
        (Risk::Low, 16) => LOW_16,
        (Risk::Medium, 8) => MEDIUM_8,
        (Risk::Medium, 10) => MEDIUM_10,
        (Risk::Medium, 12) => MEDIUM_12,
        (Risk::Medium, 14) => MEDIUM_14,
        (Risk::Medium, 16) => MEDIUM_16,
        (Risk::High, 8) => HIGH_8,
        (Risk::High, 10) => HIGH_10,
        (Risk::High, 12) => HIGH_12,
        (Risk::High, 14) => HIGH_14,
        (Risk::High, 16) => HIGH_16,
        _ => {
            return Err(GameError::Validation(
                "rows must be 8, 10, 12, 14 or 16".to_string(),
            ))
        }
    };
    Ok(table)
}

/// Outcome of one drop
#[derive(Debug, Clone, Serialize)]
pub struct BallDrop {
    pub risk: Risk,
    pub rows: u32,
    pub final_index: usize,
    /// Slot multiplier in tenths
    pub multiplier_tenths: u64,
}

impl BallDrop {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths as f64 / 10.0
    }

    pub fn payout(&self, bet: u64) -> u64 {
        bet * self.multiplier_tenths / 10
    }
}

/// Walk the ball down the board. Each row is a 50/50 step; the slot index
/// equals the number of rightward steps.
pub fn drop_ball(uniform: &mut UniformSource, rows: u32) -> usize {
    (0..rows).filter(|_| uniform() >= 0.5).count()
}

/// Drop one ball on a validated board.
pub fn play(uniform: &mut UniformSource, risk: Risk, rows: u32) -> GameResult<BallDrop> {
    let table = multipliers(risk, rows)?;
    let final_index = drop_ball(uniform, rows).min(table.len() - 1);
    Ok(BallDrop {
        risk,
        rows,
        final_index,
        multiplier_tenths: table[final_index],
    })
}
