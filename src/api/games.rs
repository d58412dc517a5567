//! Single-player game endpoints
//!
//! Every handler follows the same money movement: authenticate, validate,
//! debit the stake, draw the outcome, then settle winnings and record the
//! game through [`crate::games::settle_wager`]. Blackjack is the one
//! multi-request game; its table state rides through the client under an
//! HMAC signature instead of living on the server.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::crash::distribution::entropy_source;
use crate::errors::GameError;
use crate::games::{blackjack, dice, plinko, slots};
use crate::games::{settle_wager, validate_bet};
use crate::store::GameKind;

use super::errors::ApiError;
use super::handlers::AppState;
use super::middleware::RequestId;
use super::models::{
    BlackjackActionRequest, BlackjackResponse, BlackjackStartRequest, DiceRollRequest,
    DiceRollResponse, PlinkoDropRequest, PlinkoDropResponse, SlotsSpinRequest, SlotsSpinResponse,
};
use super::monitoring::MetricsRegistry;

/// Spin the slots
pub async fn slots_spin_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<SlotsSpinRequest>,
) -> Result<Json<SlotsSpinResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let fail = |e: GameError| ApiError::from_game(request_id.clone(), e);

    validate_bet(request.amount).map_err(fail)?;
    state.store.debit(&user_id, request.amount).await.map_err(fail)?;

    let mut source = entropy_source();
    let spin = slots::spin(&mut source);
    let win_amount = spin.payout(request.amount);

    let balance = settle_wager(
        &state.store,
        &user_id,
        GameKind::Slots,
        request.amount,
        win_amount,
        serde_json::json!({
            "reels": spin.reels,
            "symbols": spin.symbols(),
            "win_type": spin.kind,
            "multiplier": spin.multiplier(),
        }),
    )
    .await
    .map_err(fail)?;

    MetricsRegistry::incr(&state.metrics.slots_spins_total);
    info!(%user_id, win_amount, "slots spin");
    Ok(Json(SlotsSpinResponse {
        success: true,
        reels: spin.reels,
        symbols: spin.symbols(),
        win_type: spin.kind,
        multiplier: spin.multiplier(),
        win_amount,
        profit: win_amount as i64 - request.amount as i64,
        balance,
    }))
}

/// Roll the dice over or under a target
pub async fn dice_roll_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<DiceRollRequest>,
) -> Result<Json<DiceRollResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let fail = |e: GameError| ApiError::from_game(request_id.clone(), e);

    validate_bet(request.amount).map_err(fail)?;
    dice::validate_target(request.target).map_err(fail)?;
    state.store.debit(&user_id, request.amount).await.map_err(fail)?;

    let mut source = entropy_source();
    let outcome = dice::play(&mut source, request.amount, request.target, request.roll_over);

    let balance = settle_wager(
        &state.store,
        &user_id,
        GameKind::Dice,
        request.amount,
        outcome.win_amount,
        serde_json::json!({
            "roll": outcome.roll,
            "target": outcome.target,
            "roll_over": outcome.roll_over,
            "win": outcome.win,
            "multiplier": outcome.multiplier,
        }),
    )
    .await
    .map_err(fail)?;

    MetricsRegistry::incr(&state.metrics.dice_rolls_total);
    info!(%user_id, roll = outcome.roll, win = outcome.win, "dice roll");
    Ok(Json(DiceRollResponse {
        success: true,
        roll: outcome.roll,
        target: outcome.target,
        roll_over: outcome.roll_over,
        win: outcome.win,
        multiplier: outcome.multiplier,
        win_amount: outcome.win_amount,
        profit: outcome.win_amount as i64 - request.amount as i64,
        balance,
    }))
}

/// Drop a plinko ball
pub async fn plinko_drop_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<PlinkoDropRequest>,
) -> Result<Json<PlinkoDropResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let fail = |e: GameError| ApiError::from_game(request_id.clone(), e);

    validate_bet(request.amount).map_err(fail)?;
    // Reject bad boards before touching the balance.
    plinko::multipliers(request.risk, request.rows).map_err(fail)?;
    state.store.debit(&user_id, request.amount).await.map_err(fail)?;

    let mut source = entropy_source();
    let drop = plinko::play(&mut source, request.risk, request.rows).map_err(fail)?;
    let win_amount = drop.payout(request.amount);

    let balance = settle_wager(
        &state.store,
        &user_id,
        GameKind::Plinko,
        request.amount,
        win_amount,
        serde_json::json!({
            "risk": drop.risk,
            "rows": drop.rows,
            "final_index": drop.final_index,
            "multiplier": drop.multiplier(),
        }),
    )
    .await
    .map_err(fail)?;

    MetricsRegistry::incr(&state.metrics.plinko_drops_total);
    info!(%user_id, slot = drop.final_index, win_amount, "plinko drop");
    Ok(Json(PlinkoDropResponse {
        success: true,
        final_index: drop.final_index,
        multiplier: drop.multiplier(),
        win_amount,
        profit: win_amount as i64 - request.amount as i64,
        balance,
    }))
}

/// Deal a fresh blackjack hand
pub async fn blackjack_start_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<BlackjackStartRequest>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let fail = |e: GameError| ApiError::from_game(request_id.clone(), e);

    validate_bet(request.amount).map_err(fail)?;
    state.store.debit(&user_id, request.amount).await.map_err(fail)?;

    let mut source = entropy_source();
    let table = blackjack::TableState::deal(&mut source, request.amount);
    MetricsRegistry::incr(&state.metrics.blackjack_hands_total);

    if table.is_natural() {
        let settlement = table.settle_natural();
        let balance = settle_blackjack(&state, &user_id, &table, settlement).await.map_err(fail)?;
        info!(%user_id, result = settlement.result.as_str(), "blackjack natural");
        return Ok(Json(finished_response(&table, settlement, balance)));
    }

    let (blob, signature) = sign_state(&state, &table, &request_id)?;
    state.live_hands.insert(table.hand_id, ());
    Ok(Json(live_response(&table, blob, signature)))
}

/// Hit or stand on a live hand
pub async fn blackjack_action_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<BlackjackActionRequest>,
) -> Result<Json<BlackjackResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let fail = |e: GameError| ApiError::from_game(request_id.clone(), e);

    state
        .verifier
        .check_signature(&request.state, &request.state_sig)
        .map_err(fail)?;
    let mut table: blackjack::TableState = serde_json::from_str(&request.state)
        .map_err(|e| fail(GameError::Validation(format!("invalid game state: {}", e))))?;
    if table.finished {
        return Err(fail(GameError::Validation(
            "hand is already finished".to_string(),
        )));
    }
    // Consume the hand id up front: a blob whose hand was already settled
    // (or never dealt here) is rejected before any money moves.
    if state.live_hands.remove(&table.hand_id).is_none() {
        return Err(fail(GameError::Validation(
            "unknown or already settled hand".to_string(),
        )));
    }

    let settlement = match request.action {
        blackjack::PlayerAction::Hit => match table.hit() {
            Some(settlement) => settlement,
            None => {
                // Fresh id per continuation, so the pre-hit blob cannot
                // be replayed to roll a bad draw back.
                table.hand_id = Uuid::new_v4();
                let (blob, signature) = sign_state(&state, &table, &request_id)?;
                state.live_hands.insert(table.hand_id, ());
                return Ok(Json(live_response(&table, blob, signature)));
            }
        },
        blackjack::PlayerAction::Stand => table.stand(),
    };

    let balance = settle_blackjack(&state, &user_id, &table, settlement).await.map_err(fail)?;
    info!(
        %user_id,
        result = settlement.result.as_str(),
        win_amount = settlement.win_amount,
        "blackjack settled"
    );
    Ok(Json(finished_response(&table, settlement, balance)))
}

async fn settle_blackjack(
    state: &AppState,
    user_id: &str,
    table: &blackjack::TableState,
    settlement: blackjack::Settlement,
) -> Result<u64, GameError> {
    settle_wager(
        &state.store,
        user_id,
        GameKind::Blackjack,
        table.bet,
        settlement.win_amount,
        serde_json::json!({
            "result": settlement.result.as_str(),
            "player_hand": table.player,
            "dealer_hand": table.dealer,
            "player_value": table.player_value(),
            "dealer_value": table.dealer_value(),
        }),
    )
    .await
}

fn sign_state(
    state: &AppState,
    table: &blackjack::TableState,
    request_id: &str,
) -> Result<(String, String), ApiError> {
    let blob = serde_json::to_string(table).map_err(|e| {
        ApiError::internal_error(
            request_id.to_string(),
            format!("cannot serialize game state: {}", e),
        )
    })?;
    let signature = state.verifier.sign(&blob);
    Ok((blob, signature))
}

/// Hand still live: dealer shows one card, signed state rides along.
fn live_response(table: &blackjack::TableState, blob: String, signature: String) -> BlackjackResponse {
    BlackjackResponse {
        success: true,
        player_hand: table.player.clone(),
        dealer_hand: vec![table.dealer_upcard()],
        player_value: table.player_value(),
        dealer_value: None,
        finished: false,
        result: None,
        win_amount: None,
        balance: None,
        state: Some(blob),
        state_sig: Some(signature),
    }
}

/// Hand over: full dealer hand and the settlement.
fn finished_response(
    table: &blackjack::TableState,
    settlement: blackjack::Settlement,
    balance: u64,
) -> BlackjackResponse {
    BlackjackResponse {
        success: true,
        player_hand: table.player.clone(),
        dealer_hand: table.dealer.clone(),
        player_value: table.player_value(),
        dealer_value: Some(table.dealer_value()),
        finished: true,
        result: Some(settlement.result.as_str()),
        win_amount: Some(settlement.win_amount),
        balance: Some(balance),
        state: None,
        state_sig: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use axum::http::header;
    use dashmap::DashMap;
    use tokio::sync::Mutex;

    use crate::api::errors::ApiErrorKind;
    use crate::auth::TokenVerifier;
    use crate::config::CrashConfig;
    use crate::crash::{scripted_source, CrashEngine};
    use crate::games::blackjack::{Card, PlayerAction, Rank, Suit, TableState};
    use crate::store::{MemoryStore, Store};

    fn app_state(credits: u64) -> Arc<AppState> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(credits));
        let engine = CrashEngine::new(
            CrashConfig::default(),
            store.clone(),
            scripted_source(vec![]),
        );
        Arc::new(AppState {
            engine: Arc::new(Mutex::new(engine)),
            store,
            verifier: TokenVerifier::new("test-secret"),
            metrics: Arc::new(MetricsRegistry::new()),
            live_hands: DashMap::new(),
            version: "test".to_string(),
            started_at: Instant::now(),
        })
    }

    fn card(value: Rank) -> Card {
        Card {
            suit: Suit::Spades,
            value,
        }
    }

    /// Player 19 vs dealer 16; the only deck card busts the dealer.
    fn winning_table(bet: u64) -> TableState {
        TableState {
            hand_id: Uuid::new_v4(),
            deck: vec![card(Rank::Nine)],
            player: vec![card(Rank::King), card(Rank::Nine)],
            dealer: vec![card(Rank::King), card(Rank::Six)],
            bet,
            finished: false,
        }
    }

    fn auth_headers(state: &AppState, user_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = state.verifier.mint(user_id);
        if let Ok(value) = format!("Bearer {}", token).parse() {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }

    async fn act(
        state: &Arc<AppState>,
        headers: &HeaderMap,
        action: PlayerAction,
        blob: &str,
        sig: &str,
    ) -> Result<Json<BlackjackResponse>, ApiError> {
        blackjack_action_handler(
            State(state.clone()),
            Extension(RequestId("req-test".to_string())),
            headers.clone(),
            Json(BlackjackActionRequest {
                action,
                state: blob.to_string(),
                state_sig: sig.to_string(),
            }),
        )
        .await
    }

    #[tokio::test]
    async fn settled_blob_cannot_be_replayed() {
        let state = app_state(1_000);
        let headers = auth_headers(&state, "alice");
        state.store.debit("alice", 100).await.unwrap();

        let table = winning_table(100);
        state.live_hands.insert(table.hand_id, ());
        let blob = serde_json::to_string(&table).unwrap();
        let sig = state.verifier.sign(&blob);

        let response = act(&state, &headers, PlayerAction::Stand, &blob, &sig)
            .await
            .unwrap();
        assert_eq!(response.0.win_amount, Some(200));
        assert_eq!(state.store.balance("alice").await.unwrap(), 1_100);

        // The identical blob and signature again: rejected, nothing paid.
        let err = act(&state, &headers, PlayerAction::Stand, &blob, &sig)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::BadRequest(_)));
        assert_eq!(state.store.balance("alice").await.unwrap(), 1_100);
        assert_eq!(state.store.stats("alice").await.unwrap().total_games, 1);
    }

    #[tokio::test]
    async fn blob_that_was_never_dealt_is_rejected() {
        let state = app_state(1_000);
        let headers = auth_headers(&state, "alice");

        // Correctly signed, but the hand id was never registered.
        let blob = serde_json::to_string(&winning_table(100)).unwrap();
        let sig = state.verifier.sign(&blob);
        let err = act(&state, &headers, PlayerAction::Stand, &blob, &sig)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::BadRequest(_)));
        assert_eq!(state.store.balance("alice").await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn hit_retires_the_old_blob() {
        let state = app_state(1_000);
        let headers = auth_headers(&state, "alice");
        state.store.debit("alice", 100).await.unwrap();

        // Player 11; the deck deals a 9 on hit, then a 2 to the dealer.
        let table = TableState {
            hand_id: Uuid::new_v4(),
            deck: vec![card(Rank::Two), card(Rank::Nine)],
            player: vec![card(Rank::Five), card(Rank::Six)],
            dealer: vec![card(Rank::King), card(Rank::Six)],
            bet: 100,
            finished: false,
        };
        state.live_hands.insert(table.hand_id, ());
        let blob = serde_json::to_string(&table).unwrap();
        let sig = state.verifier.sign(&blob);

        let response = act(&state, &headers, PlayerAction::Hit, &blob, &sig)
            .await
            .unwrap();
        assert!(!response.0.finished);
        let next_blob = response.0.state.clone().unwrap();
        let next_sig = response.0.state_sig.clone().unwrap();

        // The pre-hit blob is dead; replaying it cannot undo the draw.
        let err = act(&state, &headers, PlayerAction::Hit, &blob, &sig)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ApiErrorKind::BadRequest(_)));

        // The fresh blob plays on: player 20 beats the dealer's 18.
        let response = act(&state, &headers, PlayerAction::Stand, &next_blob, &next_sig)
            .await
            .unwrap();
        assert_eq!(response.0.win_amount, Some(200));
        assert_eq!(state.store.balance("alice").await.unwrap(), 1_100);
    }
}
