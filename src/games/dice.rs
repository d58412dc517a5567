//! Over/under dice
//!
//! The player picks a target from 1 to 99 and a direction. The roll is
//! uniform on [0, 100) at two decimals; landing exactly on the target
//! loses either way. Payout multiplier is the fair inverse of the win
//! chance with a 1% house cut: 99/(100-target) over, 99/target under.

use serde::Serialize;

use crate::crash::distribution::UniformSource;
use crate::errors::{GameError, GameResult};

/// Outcome of one roll
#[derive(Debug, Clone, Serialize)]
pub struct DiceOutcome {
    /// The roll, two decimals in [0, 100)
    pub roll: f64,
    pub target: u32,
    pub roll_over: bool,
    pub win: bool,
    /// Display multiplier; payouts use exact integer math
    pub multiplier: f64,
    pub win_amount: u64,
}

pub fn validate_target(target: u32) -> GameResult<()> {
    if !(1..=99).contains(&target) {
        return Err(GameError::Validation(
            "target must be between 1 and 99".to_string(),
        ));
    }
    Ok(())
}

/// Draw a roll at two decimal places.
pub fn roll(uniform: &mut UniformSource) -> f64 {
    (uniform() * 10_000.0).floor() / 100.0
}

/// Winning payout for the given stake and pick. The multiplier is the
/// rational 99/(100-target) or 99/target; integer division floors once.
pub fn winning_payout(bet: u64, target: u32, roll_over: bool) -> u64 {
    if roll_over {
        bet * 99 / (100 - target) as u64
    } else {
        bet * 99 / target as u64
    }
}

pub fn multiplier(target: u32, roll_over: bool) -> f64 {
    if roll_over {
        99.0 / (100 - target) as f64
    } else {
        99.0 / target as f64
    }
}

/// Play one round: roll, compare, pay.
pub fn play(uniform: &mut UniformSource, bet: u64, target: u32, roll_over: bool) -> DiceOutcome {
    let roll = roll(uniform);
    let win = if roll_over {
        roll > target as f64
    } else {
        roll < target as f64
    };
    let win_amount = if win {
        winning_payout(bet, target, roll_over)
    } else {
        0
    };
    DiceOutcome {
        roll,
        target,
        roll_over,
        win,
        multiplier: multiplier(target, roll_over),
        win_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::distribution::scripted_source;

    #[test]
    fn target_bounds() {
        assert!(validate_target(0).is_err());
        assert!(validate_target(1).is_ok());
        assert!(validate_target(99).is_ok());
        assert!(validate_target(100).is_err());
    }

    #[test]
    fn roll_has_two_decimals() {
        let mut source = scripted_source(vec![0.123456, 0.999999]);
        assert_eq!(roll(&mut source), 12.34);
        assert_eq!(roll(&mut source), 99.99);
    }

    #[test]
    fn even_money_at_fifty() {
        // Over 50: 49.5% win chance, pays 99/50 = 1.98x.
        assert_eq!(winning_payout(100, 50, true), 198);
        assert_eq!(winning_payout(100, 50, false), 198);
    }

    #[test]
    fn payout_floors() {
        // Under 99: 99/99 = 1x exactly; over 1: 99/99 = 1x.
        assert_eq!(winning_payout(100, 99, false), 100);
        // Over 66: 99/34 = 2.91..., floor on 10 credits is 29.
        assert_eq!(winning_payout(10, 66, true), 29);
    }

    #[test]
    fn landing_on_the_target_loses_both_ways() {
        // Roll exactly 50.00.
        let mut source = scripted_source(vec![0.5]);
        let outcome = play(&mut source, 100, 50, true);
        assert!(!outcome.win);
        assert_eq!(outcome.win_amount, 0);

        let mut source = scripted_source(vec![0.5]);
        let outcome = play(&mut source, 100, 50, false);
        assert!(!outcome.win);
    }

    #[test]
    fn over_and_under_split_the_line() {
        // Roll 75.00 against target 50.
        let mut source = scripted_source(vec![0.75]);
        let outcome = play(&mut source, 100, 50, true);
        assert!(outcome.win);
        assert_eq!(outcome.win_amount, 198);

        let mut source = scripted_source(vec![0.75]);
        let outcome = play(&mut source, 100, 50, false);
        assert!(!outcome.win);
    }
}
