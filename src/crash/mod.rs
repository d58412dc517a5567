//! Crash: the shared real-time round game
//!
//! A single server-wide round cycles countdown -> running -> crashed
//! forever. Players stake during the countdown, watch a multiplier climb
//! while running, and cash out before the round crashes at a point drawn
//! secretly at launch. Everyone sees the same round over the event
//! broadcast.

pub mod distribution;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod round;

pub use distribution::{entropy_source, scripted_source, UniformSource};
pub use engine::{spawn_driver, CashoutReceipt, CrashEngine, CrashOutcome, Step};
pub use events::{CrashEvent, CrashSnapshot, MyBet};
pub use ledger::{Bet, BetLedger};
pub use round::{Phase, Round};
