//! Request handlers
//!
//! Shared application state, bearer-token authentication, and the
//! handlers for health, the crash game, and account endpoints. The
//! single-player games live in [`super::games`].

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, State},
    http::{header, HeaderMap},
    Json,
};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::auth::{bearer_token, TokenVerifier};
use crate::crash::CrashEngine;
use crate::store::Store;

use super::errors::ApiError;
use super::middleware::RequestId;
use super::models::{
    BalanceResponse, CrashBetRequest, CrashBetResponse, CrashCashoutResponse, CrashStateResponse,
    HealthResponse, StatsResponse,
};
use super::monitoring::MetricsRegistry;

/// Shared state for all handlers
pub struct AppState {
    pub engine: Arc<Mutex<CrashEngine>>,
    pub store: Arc<dyn Store>,
    pub verifier: TokenVerifier,
    pub metrics: Arc<MetricsRegistry>,
    /// Blackjack hands in flight. A signed state blob is only honored
    /// while its hand id is present; settlement removes it, so replaying
    /// an old blob cannot pay twice.
    pub live_hands: DashMap<Uuid, ()>,
    pub version: String,
    pub started_at: Instant,
}

impl AppState {
    /// Resolve the caller from the Authorization header.
    pub fn authenticate(&self, headers: &HeaderMap, request_id: &str) -> Result<String, ApiError> {
        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = bearer_token(header).ok_or_else(|| {
            ApiError::unauthorized(request_id.to_string(), "missing bearer token".to_string())
        })?;
        self.verifier
            .verify(token)
            .map_err(|e| ApiError::from_game(request_id.to_string(), e))
    }

    /// Like [`authenticate`](Self::authenticate) but anonymous callers
    /// are fine. Used by read-only endpoints that personalize when a
    /// valid token is present.
    pub fn maybe_authenticate(&self, headers: &HeaderMap) -> Option<String> {
        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        bearer_token(header).and_then(|token| self.verifier.verify(token).ok())
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Current round state, with the caller's own bet when authenticated
pub async fn crash_state_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<CrashStateResponse> {
    let user_id = state.maybe_authenticate(&headers);
    let engine = state.engine.lock().await;
    let snapshot = engine.snapshot();
    let my_bet = user_id.as_deref().and_then(|user| engine.my_bet(user));

    Json(CrashStateResponse {
        phase: snapshot.phase,
        countdown: snapshot.countdown,
        multiplier: snapshot.multiplier,
        history: snapshot.history,
        active_bets: snapshot.active_bets,
        my_bet,
    })
}

/// Place a stake in the upcoming crash round
pub async fn crash_bet_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    Json(request): Json<CrashBetRequest>,
) -> Result<Json<CrashBetResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;

    let balance = state
        .engine
        .lock()
        .await
        .place_bet(&user_id, request.amount)
        .await
        .map_err(|e| ApiError::from_game(request_id, e))?;

    MetricsRegistry::incr(&state.metrics.crash_bets_total);
    info!(%user_id, amount = request.amount, "crash bet placed");
    Ok(Json(CrashBetResponse {
        success: true,
        amount: request.amount,
        balance,
    }))
}

/// Lock in the current multiplier for a running bet
pub async fn crash_cashout_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<CrashCashoutResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;

    let receipt = state
        .engine
        .lock()
        .await
        .cash_out(&user_id)
        .await
        .map_err(|e| ApiError::from_game(request_id, e))?;

    MetricsRegistry::incr(&state.metrics.crash_cashouts_total);
    info!(
        %user_id,
        multiplier = receipt.multiplier,
        win_amount = receipt.win_amount,
        "crash cashout"
    );
    Ok(Json(CrashCashoutResponse {
        success: true,
        multiplier: receipt.multiplier,
        win_amount: receipt.win_amount,
        profit: receipt.profit,
        balance: receipt.balance,
    }))
}

/// Current balance for the caller
pub async fn balance_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let balance = state
        .store
        .balance(&user_id)
        .await
        .map_err(|e| ApiError::from_game(request_id, e))?;
    Ok(Json(BalanceResponse { balance }))
}

/// Aggregate stats and recent games for the caller
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let user_id = state.authenticate(&headers, &request_id)?;
    let stats = state
        .store
        .stats(&user_id)
        .await
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?;
    let recent_games = state
        .store
        .recent_games(&user_id)
        .await
        .map_err(|e| ApiError::from_game(request_id, e))?;
    Ok(Json(StatsResponse {
        stats,
        recent_games,
    }))
}
