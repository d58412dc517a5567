//! Round state for the crash game
//!
//! Exactly one round is live at a time. It is owned by the engine and
//! mutated only by engine steps; everything else sees snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::distribution::ONE_X;

/// Phase of the live round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Countdown before launch; the only phase accepting bets
    Waiting,
    /// Multiplier climbing; the only phase accepting cashouts
    Running,
    /// Post-crash pause before the next countdown
    Crashed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Running => "running",
            Phase::Crashed => "crashed",
        }
    }
}

/// The authoritative round state
#[derive(Debug, Clone)]
pub struct Round {
    pub phase: Phase,
    /// Countdown ticks remaining; meaningful in `Waiting` only
    pub countdown: u32,
    /// Current multiplier in hundredths (100 = 1.00x)
    pub multiplier: u32,
    /// Drawn once at `Running` entry; 0 until then
    pub crash_point: u32,
    pub started_at: Option<DateTime<Utc>>,
}

impl Round {
    /// Fresh round entering its countdown.
    pub fn waiting(countdown: u32) -> Self {
        Self {
            phase: Phase::Waiting,
            countdown,
            multiplier: ONE_X,
            crash_point: 0,
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn accepts_bets(&self) -> bool {
        self.phase == Phase::Waiting
    }
}
