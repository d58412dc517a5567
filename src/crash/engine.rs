//! Crash round engine
//!
//! One engine instance owns the live round, the bet ledger, and the crash
//! history. It sits behind a `tokio::sync::Mutex`; the driver task locks
//! it, advances one step, and sleeps for the delay the step reports, so
//! phase transitions and bet/cashout handlers never interleave.
//!
//! `step` is synchronous on purpose: a round launch that draws a 1.00x
//! crash point crashes inside the same step, with the lock held, so no
//! cashout can slip in between launch and crash.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::config::CrashConfig;
use crate::errors::{Conflict, GameError, GameResult};
use crate::store::{GameKind, GameRecord, Store};

use super::distribution::{as_decimal, draw_crash_point, UniformSource};
use super::events::{CrashEvent, CrashSnapshot, MyBet};
use super::ledger::{Bet, BetLedger};
use super::round::{Phase, Round};

/// Broadcast channel depth; slow viewers lag and lose ticks, which is
/// acceptable for a spectator stream.
const EVENT_CAPACITY: usize = 256;

/// What one engine step asks of the driver.
pub struct Step {
    /// How long to sleep before the next step
    pub delay: Duration,
    /// Present when this step ended the round; losses still need settling
    pub crashed: Option<CrashOutcome>,
}

impl Step {
    fn after(delay: Duration) -> Self {
        Self {
            delay,
            crashed: None,
        }
    }
}

/// End-of-round settlement work, handed off the lock path
pub struct CrashOutcome {
    pub crash_point: u32,
    pub losses: Vec<Bet>,
}

/// Response payload for a successful cashout
#[derive(Debug, Clone, Serialize)]
pub struct CashoutReceipt {
    pub multiplier: f64,
    pub win_amount: u64,
    pub profit: u64,
    pub balance: u64,
}

/// The authoritative crash game state machine
pub struct CrashEngine {
    config: CrashConfig,
    store: Arc<dyn Store>,
    source: UniformSource,
    round: Round,
    ledger: BetLedger,
    /// Recent crash points, newest first, capped at `history_limit`
    history: Vec<u32>,
    events: broadcast::Sender<CrashEvent>,
}

impl CrashEngine {
    pub fn new(config: CrashConfig, store: Arc<dyn Store>, source: UniformSource) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let round = Round::waiting(config.countdown_ticks);
        Self {
            config,
            store,
            source,
            round,
            ledger: BetLedger::new(),
            history: Vec::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrashEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Advance the round by one step. The caller sleeps for the returned
    /// delay and settles any reported losses off the lock path.
    pub fn step(&mut self) -> Step {
        match self.round.phase {
            Phase::Waiting => {
                if self.round.countdown == 0 {
                    self.launch()
                } else {
                    self.tick_countdown()
                }
            }
            Phase::Running => self.tick_running(),
            Phase::Crashed => {
                self.round = Round::waiting(self.config.countdown_ticks);
                self.tick_countdown()
            }
        }
    }

    fn tick_countdown(&mut self) -> Step {
        self.publish(CrashEvent::Waiting {
            countdown: self.round.countdown,
        });
        self.round.countdown -= 1;
        Step::after(self.config.countdown_tick())
    }

    fn launch(&mut self) -> Step {
        self.round.phase = Phase::Running;
        self.round.started_at = Some(chrono::Utc::now());
        self.round.crash_point = draw_crash_point(&mut self.source);
        debug!(
            crash_point = self.round.crash_point,
            bets = self.ledger.len(),
            "round launched"
        );
        self.publish(CrashEvent::Started);
        if self.round.multiplier >= self.round.crash_point {
            // A 1.00x draw crashes before the first tick.
            return self.crash();
        }
        Step::after(self.config.run_tick())
    }

    fn tick_running(&mut self) -> Step {
        self.round.multiplier += self.config.multiplier_step;
        if self.round.multiplier >= self.round.crash_point {
            self.crash()
        } else {
            self.publish(CrashEvent::Tick {
                multiplier: as_decimal(self.round.multiplier),
            });
            Step::after(self.config.run_tick())
        }
    }

    fn crash(&mut self) -> Step {
        let crash_point = self.round.crash_point;
        self.round.multiplier = self.round.multiplier.min(crash_point);
        self.round.phase = Phase::Crashed;

        self.history.insert(0, crash_point);
        self.history.truncate(self.config.history_limit);

        let losses = self.ledger.drain_losses();
        info!(
            crash_point = as_decimal(crash_point),
            losses = losses.len(),
            "round crashed"
        );
        self.publish(CrashEvent::Crashed {
            crash_point: as_decimal(crash_point),
            multiplier: as_decimal(self.round.multiplier),
        });

        Step {
            delay: self.config.restart_delay(),
            crashed: Some(CrashOutcome {
                crash_point,
                losses,
            }),
        }
    }

    /// Place a stake in the upcoming round. Debits the balance first;
    /// returns the balance after the debit.
    pub async fn place_bet(&mut self, user_id: &str, amount: u64) -> GameResult<u64> {
        if amount == 0 {
            return Err(GameError::Validation(
                "bet amount must be positive".to_string(),
            ));
        }
        if !self.round.accepts_bets() {
            return Err(Conflict::RoundNotAcceptingBets.into());
        }
        if self.ledger.contains(user_id) {
            return Err(Conflict::AlreadyBet.into());
        }

        let balance = self.store.debit(user_id, amount).await?;
        self.ledger.place(user_id, amount)?;

        self.publish(CrashEvent::Bet {
            user_id: user_id.to_string(),
            total_bets: self.ledger.len(),
        });
        Ok(balance)
    }

    /// Lock in the current multiplier for a running bet. Credits the
    /// payout before recording the win; a failed record is logged and
    /// the payout stands.
    pub async fn cash_out(&mut self, user_id: &str) -> GameResult<CashoutReceipt> {
        let bet = self.ledger.get(user_id).ok_or(Conflict::NoActiveBet)?;
        if bet.cashed_out {
            return Err(Conflict::AlreadyCashedOut.into());
        }
        if !self.round.is_running() {
            return Err(Conflict::RoundNotRunning.into());
        }

        let multiplier = self.round.multiplier;
        let stake = self.ledger.cash_out(user_id, multiplier)?;
        let win_amount = stake * multiplier as u64 / 100;

        let balance = self.store.credit(user_id, win_amount).await?;
        let record = GameRecord::new(
            user_id,
            GameKind::Crash,
            stake,
            win_amount,
            serde_json::json!({ "cashout_multiplier": as_decimal(multiplier) }),
        );
        if let Err(err) = self.store.record_game(record).await {
            warn!(user_id, %err, "failed to record crash win");
        }

        self.publish(CrashEvent::Cashout {
            user_id: user_id.to_string(),
            multiplier: as_decimal(multiplier),
            win_amount,
        });
        Ok(CashoutReceipt {
            multiplier: as_decimal(multiplier),
            win_amount,
            profit: win_amount - stake,
            balance,
        })
    }

    /// Viewer snapshot: phase, multiplier, history, bet count.
    pub fn snapshot(&self) -> CrashSnapshot {
        CrashSnapshot::new(&self.round, &self.history, self.ledger.len())
    }

    /// The caller's own bet in the current round, if any.
    pub fn my_bet(&self, user_id: &str) -> Option<MyBet> {
        self.ledger.get(user_id).map(MyBet::from)
    }

    fn publish(&self, event: CrashEvent) {
        // No subscribers is fine; ticks exist to be watched, not stored.
        let _ = self.events.send(event);
    }
}

/// Record the losses of a crashed round. Failures are logged, never
/// propagated: the round loop must not stall on a bad write.
pub async fn settle_losses(store: Arc<dyn Store>, outcome: CrashOutcome) {
    let crash_point = as_decimal(outcome.crash_point);
    for bet in outcome.losses {
        let record = GameRecord::new(
            bet.user_id.clone(),
            GameKind::Crash,
            bet.stake,
            0,
            serde_json::json!({ "crash_point": crash_point }),
        );
        if let Err(err) = store.record_game(record).await {
            warn!(user_id = %bet.user_id, %err, "failed to record crash loss");
        }
    }
}

/// Drive the engine forever: lock, step, hand settlement to its own task,
/// sleep for the step's delay.
pub fn spawn_driver(engine: Arc<Mutex<CrashEngine>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let store = engine.lock().await.store();
        loop {
            let step = engine.lock().await.step();
            if let Some(outcome) = step.crashed {
                tokio::spawn(settle_losses(store.clone(), outcome));
            }
            tokio::time::sleep(step.delay).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::distribution::scripted_source;
    use crate::store::MemoryStore;

    fn engine_with(script: Vec<f64>, starting_credits: u64) -> (CrashEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(starting_credits));
        let engine = CrashEngine::new(
            CrashConfig::default(),
            store.clone(),
            scripted_source(script),
        );
        (engine, store)
    }

    /// Step through the whole countdown so the next step launches.
    fn run_countdown(engine: &mut CrashEngine) {
        for _ in 0..engine.config.countdown_ticks {
            let step = engine.step();
            assert!(step.crashed.is_none());
            assert_eq!(step.delay, engine.config.countdown_tick());
        }
    }

    #[test]
    fn countdown_counts_five_to_one() {
        // Band 0.80, position 0.5 -> 1.65x
        let (mut engine, _) = engine_with(vec![0.80, 0.5], 1_000);
        let mut events = engine.subscribe();

        run_countdown(&mut engine);
        for expected in (1..=5).rev() {
            assert_eq!(
                events.try_recv().unwrap(),
                CrashEvent::Waiting {
                    countdown: expected
                }
            );
        }
    }

    #[test]
    fn round_runs_to_its_crash_point() {
        // 1.00 + 0.10 * 0.30 = 1.03x, three ticks after launch
        let (mut engine, _) = engine_with(vec![0.0, 0.10], 1_000);
        let mut events = engine.subscribe();

        run_countdown(&mut engine);
        let step = engine.step();
        assert!(step.crashed.is_none());
        assert_eq!(step.delay, engine.config.run_tick());

        // Two ticks at 1.01 and 1.02, the third crosses 1.03 and crashes.
        assert!(engine.step().crashed.is_none());
        assert!(engine.step().crashed.is_none());
        let step = engine.step();
        let outcome = step.crashed.expect("round should crash at 1.03");
        assert_eq!(outcome.crash_point, 103);
        assert_eq!(step.delay, engine.config.restart_delay());

        // Drain countdown events, then check the run.
        for _ in 0..5 {
            events.try_recv().unwrap();
        }
        assert_eq!(events.try_recv().unwrap(), CrashEvent::Started);
        assert_eq!(
            events.try_recv().unwrap(),
            CrashEvent::Tick { multiplier: 1.01 }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            CrashEvent::Tick { multiplier: 1.02 }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            CrashEvent::Crashed {
                crash_point: 1.03,
                multiplier: 1.03
            }
        );
    }

    #[test]
    fn instant_crash_at_one_x_never_ticks() {
        // Band 0, position 0 -> exactly 1.00x
        let (mut engine, _) = engine_with(vec![0.0, 0.0], 1_000);

        run_countdown(&mut engine);
        let step = engine.step();
        let outcome = step.crashed.expect("1.00x must crash on launch");
        assert_eq!(outcome.crash_point, 100);
        assert_eq!(engine.snapshot().phase, "crashed");
    }

    #[test]
    fn crashed_step_starts_the_next_countdown() {
        let (mut engine, _) = engine_with(vec![0.0, 0.0, 0.80, 0.5], 1_000);
        run_countdown(&mut engine);
        engine.step(); // instant crash

        let step = engine.step();
        assert!(step.crashed.is_none());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, "waiting");
        assert_eq!(snapshot.countdown, Some(4));
        assert_eq!(snapshot.history, vec![1.0]);
    }

    #[tokio::test]
    async fn bet_debits_and_joins_the_round() {
        let (mut engine, store) = engine_with(vec![0.80, 0.5], 1_000);
        let mut events = engine.subscribe();

        let balance = engine.place_bet("alice", 100).await.unwrap();
        assert_eq!(balance, 900);
        assert_eq!(store.balance("alice").await.unwrap(), 900);
        assert_eq!(engine.my_bet("alice").unwrap().amount, 100);
        assert_eq!(
            events.try_recv().unwrap(),
            CrashEvent::Bet {
                user_id: "alice".to_string(),
                total_bets: 1
            }
        );
    }

    #[tokio::test]
    async fn second_bet_is_rejected_before_any_debit() {
        let (mut engine, store) = engine_with(vec![0.80, 0.5], 1_000);
        engine.place_bet("alice", 100).await.unwrap();

        let err = engine.place_bet("alice", 50).await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::AlreadyBet)
        ));
        assert_eq!(store.balance("alice").await.unwrap(), 900);
    }

    #[tokio::test]
    async fn bets_close_once_the_round_launches() {
        let (mut engine, _) = engine_with(vec![0.80, 0.5], 1_000);
        run_countdown(&mut engine);
        engine.step(); // launch

        let err = engine.place_bet("alice", 100).await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::RoundNotAcceptingBets)
        ));
    }

    #[tokio::test]
    async fn overdraft_leaves_no_bet_behind() {
        let (mut engine, _) = engine_with(vec![0.80, 0.5], 50);
        let err = engine.place_bet("alice", 100).await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::InsufficientFunds)
        ));
        assert!(engine.my_bet("alice").is_none());
    }

    #[tokio::test]
    async fn cashout_pays_the_current_multiplier() {
        // Crashes at 1.65, plenty of room.
        let (mut engine, store) = engine_with(vec![0.80, 0.5], 1_000);
        engine.place_bet("alice", 100).await.unwrap();
        run_countdown(&mut engine);
        engine.step(); // launch at 1.00
        engine.step(); // 1.01
        engine.step(); // 1.02

        let receipt = engine.cash_out("alice").await.unwrap();
        assert_eq!(receipt.multiplier, 1.02);
        assert_eq!(receipt.win_amount, 102);
        assert_eq!(receipt.profit, 2);
        assert_eq!(receipt.balance, 1_002);
        assert_eq!(store.balance("alice").await.unwrap(), 1_002);

        let stats = store.stats("alice").await.unwrap();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_won, 102);
    }

    #[tokio::test]
    async fn cashout_payout_floors() {
        // Stake 7 at 1.50x pays floor(7 * 150 / 100) = 10.
        let (mut engine, _) = engine_with(vec![0.80, 0.7857142857142857], 1_000);
        engine.place_bet("alice", 7).await.unwrap();
        run_countdown(&mut engine);
        engine.step(); // launch
        for _ in 0..50 {
            engine.step();
        }

        let receipt = engine.cash_out("alice").await.unwrap();
        assert_eq!(receipt.multiplier, 1.5);
        assert_eq!(receipt.win_amount, 10);
    }

    #[tokio::test]
    async fn cashout_twice_is_rejected() {
        let (mut engine, _) = engine_with(vec![0.80, 0.5], 1_000);
        engine.place_bet("alice", 100).await.unwrap();
        run_countdown(&mut engine);
        engine.step();
        engine.step();

        engine.cash_out("alice").await.unwrap();
        let err = engine.cash_out("alice").await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::AlreadyCashedOut)
        ));
    }

    #[tokio::test]
    async fn cashout_without_bet_or_round_is_phase_checked_last() {
        let (mut engine, _) = engine_with(vec![0.80, 0.5], 1_000);

        // No bet at all: NoActiveBet even though the round is not running.
        let err = engine.cash_out("alice").await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::NoActiveBet)
        ));

        // Bet placed but round still counting down: RoundNotRunning.
        engine.place_bet("alice", 100).await.unwrap();
        let err = engine.cash_out("alice").await.unwrap_err();
        assert!(matches!(
            err,
            GameError::StateConflict(Conflict::RoundNotRunning)
        ));
    }

    #[tokio::test]
    async fn crash_drains_losses_and_settlement_records_them() {
        // 1.00 + 0.01/0.30 of the band ~ crash at 1.01.
        let (mut engine, store) = engine_with(vec![0.0, 0.0334], 1_000);
        engine.place_bet("alice", 100).await.unwrap();
        engine.place_bet("bob", 200).await.unwrap();
        run_countdown(&mut engine);
        engine.step(); // launch
        let step = engine.step(); // crash at 1.01

        let outcome = step.crashed.expect("round should crash");
        assert_eq!(outcome.losses.len(), 2);
        assert!(engine.my_bet("alice").is_none());

        settle_losses(store.clone(), outcome).await;
        let stats = store.stats("alice").await.unwrap();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_wagered, 100);
        assert_eq!(stats.total_won, 0);
        // Stakes were debited at bet time and never return.
        assert_eq!(store.balance("bob").await.unwrap(), 800);
    }

    #[tokio::test]
    async fn cashed_out_bet_is_not_a_loss() {
        let (mut engine, store) = engine_with(vec![0.80, 0.5], 1_000);
        engine.place_bet("alice", 100).await.unwrap();
        engine.place_bet("bob", 100).await.unwrap();
        run_countdown(&mut engine);
        engine.step(); // launch
        engine.step(); // 1.01
        engine.cash_out("alice").await.unwrap();

        // Run to the 1.65 crash.
        let outcome = loop {
            if let Some(outcome) = engine.step().crashed {
                break outcome;
            }
        };
        let losers: Vec<&str> = outcome.losses.iter().map(|b| b.user_id.as_str()).collect();
        assert_eq!(losers, vec!["bob"]);
        assert_eq!(store.balance("alice").await.unwrap(), 1_001);
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut script = Vec::new();
        for _ in 0..25 {
            script.push(0.0);
            script.push(0.0);
        }
        let (mut engine, _) = engine_with(script, 1_000);
        for _ in 0..25 {
            loop {
                if engine.step().crashed.is_some() {
                    break;
                }
            }
        }
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.history.len(), 20);
        assert!(snapshot.history.iter().all(|&cp| cp == 1.0));
    }
}
