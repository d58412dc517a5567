//! Route definitions
//!
//! Maps URLs to handlers with type-safe routing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::{
    games::{
        blackjack_action_handler, blackjack_start_handler, dice_roll_handler,
        plinko_drop_handler, slots_spin_handler,
    },
    handlers::{
        balance_handler, crash_bet_handler, crash_cashout_handler, crash_state_handler,
        health_handler, stats_handler, AppState,
    },
    monitoring::metrics_handler,
    websocket::websocket_handler,
};

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // The shared crash round
        .route("/api/crash/state", get(crash_state_handler))
        .route("/api/crash/bet", post(crash_bet_handler))
        .route("/api/crash/cashout", post(crash_cashout_handler))
        // Single-player games
        .route("/api/slots/spin", post(slots_spin_handler))
        .route("/api/dice/roll", post(dice_roll_handler))
        .route("/api/plinko/drop", post(plinko_drop_handler))
        .route("/api/blackjack/start", post(blackjack_start_handler))
        .route("/api/blackjack/action", post(blackjack_action_handler))
        // Account
        .route("/api/user/balance", get(balance_handler))
        .route("/api/user/stats", get(stats_handler))
        // Real-time round feed
        .route("/ws", get(websocket_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        // Attach shared state
        .with_state(state)
}
