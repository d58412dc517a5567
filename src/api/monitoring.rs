//! Monitoring and metrics
//!
//! Counter registry exported in Prometheus text format. Handlers bump the
//! counters inline; nothing here is on a hot path worth batching.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::handlers::AppState;

/// Prometheus-compatible metrics registry
#[derive(Default)]
pub struct MetricsRegistry {
    /// HTTP request metrics
    pub http_requests_total: AtomicU64,
    pub http_errors_total: AtomicU64,

    /// Crash game metrics
    pub crash_bets_total: AtomicU64,
    pub crash_cashouts_total: AtomicU64,

    /// Single-player game metrics
    pub slots_spins_total: AtomicU64,
    pub dice_rolls_total: AtomicU64,
    pub plinko_drops_total: AtomicU64,
    pub blackjack_hands_total: AtomicU64,

    /// WebSocket metrics
    pub websocket_connections_active: AtomicU64,
    pub websocket_messages_sent: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }

    /// Export every counter in Prometheus text exposition format.
    pub fn to_prometheus_format(&self) -> String {
        let mut out = String::new();
        let mut write = |name: &str, help: &str, value: u64| {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            ));
        };

        write(
            "croupier_http_requests_total",
            "Total HTTP requests handled",
            self.http_requests_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_http_errors_total",
            "Total HTTP error responses",
            self.http_errors_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_crash_bets_total",
            "Total crash bets placed",
            self.crash_bets_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_crash_cashouts_total",
            "Total crash cashouts",
            self.crash_cashouts_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_slots_spins_total",
            "Total slots spins",
            self.slots_spins_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_dice_rolls_total",
            "Total dice rolls",
            self.dice_rolls_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_plinko_drops_total",
            "Total plinko drops",
            self.plinko_drops_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_blackjack_hands_total",
            "Total blackjack hands dealt",
            self.blackjack_hands_total.load(Ordering::Relaxed),
        );
        write(
            "croupier_websocket_connections_active",
            "Currently connected WebSocket viewers",
            self.websocket_connections_active.load(Ordering::Relaxed),
        );
        write(
            "croupier_websocket_messages_sent",
            "Total WebSocket messages sent",
            self.websocket_messages_sent.load(Ordering::Relaxed),
        );
        out
    }
}

/// Count every request and every error response.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> axum::response::Response {
    MetricsRegistry::incr(&state.metrics.http_requests_total);
    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        MetricsRegistry::incr(&state.metrics.http_errors_total);
    }
    response
}

/// Axum handler for the Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response<String> {
    let metrics = state.metrics.to_prometheus_format();
    Response::builder()
        .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
        .body(metrics)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_export() {
        let registry = MetricsRegistry::new();
        MetricsRegistry::incr(&registry.crash_bets_total);
        MetricsRegistry::incr(&registry.crash_bets_total);

        let text = registry.to_prometheus_format();
        assert!(text.contains("croupier_crash_bets_total 2"));
        assert!(text.contains("# TYPE croupier_http_requests_total counter"));
    }

    #[test]
    fn active_connections_go_up_and_down() {
        let registry = MetricsRegistry::new();
        MetricsRegistry::incr(&registry.websocket_connections_active);
        MetricsRegistry::incr(&registry.websocket_connections_active);
        MetricsRegistry::decr(&registry.websocket_connections_active);
        assert_eq!(
            registry.websocket_connections_active.load(Ordering::Relaxed),
            1
        );
    }
}
