//! Three-reel weighted slots
//!
//! Each reel draws one of six symbols by weight. Three of a kind pays the
//! symbol's full multiplier, a pair pays a tenth of the paired symbol's
//! multiplier, anything else loses. Multipliers are kept in tenths so the
//! pair payouts stay in integer arithmetic.

use serde::Serialize;

use crate::crash::distribution::UniformSource;

/// One reel symbol with its payout and draw weight
pub struct Symbol {
    pub emoji: &'static str,
    /// Three-of-a-kind multiplier in tenths (1000 = 100x)
    pub multiplier_tenths: u64,
    pub weight: u32,
}

/// Rarest first; weights sum to 100.
pub const SYMBOLS: [Symbol; 6] = [
    Symbol { emoji: "💎", multiplier_tenths: 1_000, weight: 1 },
    Symbol { emoji: "🔥", multiplier_tenths: 500, weight: 2 },
    Symbol { emoji: "⚡", multiplier_tenths: 250, weight: 5 },
    Symbol { emoji: "💰", multiplier_tenths: 150, weight: 10 },
    Symbol { emoji: "🍀", multiplier_tenths: 100, weight: 20 },
    Symbol { emoji: "🎯", multiplier_tenths: 50, weight: 62 },
];

const TOTAL_WEIGHT: u32 = 100;

/// How a spin resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinKind {
    /// Three of a kind, full multiplier
    Jackpot,
    /// A pair, a tenth of the multiplier
    Win,
    Loss,
}

/// Outcome of one spin
#[derive(Debug, Clone, Serialize)]
pub struct Spin {
    /// Indexes into [`SYMBOLS`]
    pub reels: [usize; 3],
    pub kind: SpinKind,
    /// Payout multiplier in tenths; 0 on a loss
    pub multiplier_tenths: u64,
}

impl Spin {
    pub fn symbols(&self) -> [&'static str; 3] {
        [
            SYMBOLS[self.reels[0]].emoji,
            SYMBOLS[self.reels[1]].emoji,
            SYMBOLS[self.reels[2]].emoji,
        ]
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths as f64 / 10.0
    }

    pub fn payout(&self, bet: u64) -> u64 {
        bet * self.multiplier_tenths / 10
    }
}

/// One weighted draw: walk the table subtracting weights.
pub fn draw_symbol(uniform: &mut UniformSource) -> usize {
    let mut roll = uniform() * TOTAL_WEIGHT as f64;
    for (index, symbol) in SYMBOLS.iter().enumerate() {
        roll -= symbol.weight as f64;
        if roll <= 0.0 {
            return index;
        }
    }
    SYMBOLS.len() - 1
}

/// Spin three reels and grade the line.
pub fn spin(uniform: &mut UniformSource) -> Spin {
    let reels = [
        draw_symbol(uniform),
        draw_symbol(uniform),
        draw_symbol(uniform),
    ];
    let (kind, multiplier_tenths) = grade(reels);
    Spin {
        reels,
        kind,
        multiplier_tenths,
    }
}

fn grade(reels: [usize; 3]) -> (SpinKind, u64) {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        return (SpinKind::Jackpot, SYMBOLS[reels[0]].multiplier_tenths);
    }
    if reels[0] == reels[1] || reels[1] == reels[2] || reels[0] == reels[2] {
        let matching = if reels[0] == reels[1] {
            reels[0]
        } else if reels[1] == reels[2] {
            reels[1]
        } else {
            reels[0]
        };
        return (SpinKind::Win, SYMBOLS[matching].multiplier_tenths / 10);
    }
    (SpinKind::Loss, 0)
}
