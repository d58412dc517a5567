//! Configuration management with validation and defaults
//!
//! Layered configuration: built-in defaults, optional TOML file, then
//! CLI overrides applied by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{GameError, GameResult};

/// Top-level configuration for the Croupier server
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CroupierConfig {
    pub server: ServerConfig,
    pub crash: CrashConfig,
    pub auth: AuthConfig,
    pub bank: BankConfig,
}

/// HTTP/WebSocket server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Timing and payout parameters for the crash round loop
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    /// Countdown ticks before a round starts
    pub countdown_ticks: u32,
    /// Interval between countdown ticks
    pub countdown_tick_ms: u64,
    /// Interval between multiplier ticks while running
    pub run_tick_ms: u64,
    /// Multiplier gain per running tick, in hundredths (1 = +0.01x)
    pub multiplier_step: u32,
    /// Pause between a crash and the next countdown
    pub restart_delay_ms: u64,
    /// Number of past crash points kept for new viewers
    pub history_limit: usize,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 5,
            countdown_tick_ms: 1_000,
            run_tick_ms: 50,
            multiplier_step: 1,
            restart_delay_ms: 3_000,
            history_limit: 20,
        }
    }
}

impl CrashConfig {
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn run_tick(&self) -> Duration {
        Duration::from_millis(self.run_tick_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

/// Bearer-token verification settings. Token issuance happens in the
/// identity service; this server only verifies.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Development fallback; override in production via config file
            // or CROUPIER_TOKEN_SECRET.
            token_secret: "croupier-dev-secret".to_string(),
        }
    }
}

/// Credit account settings for the in-memory store
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Balance granted to an account on first use
    pub starting_credits: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            starting_credits: 1_000,
        }
    }
}

impl CroupierConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any missing section.
    pub fn load(path: &Path) -> GameResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GameError::Validation(format!("cannot read config {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| GameError::Validation(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (secrets should not live in files
    /// checked into deployments).
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("CROUPIER_TOKEN_SECRET") {
            if !secret.is_empty() {
                self.auth.token_secret = secret;
            }
        }
        if let Ok(port) = std::env::var("CROUPIER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.crash.countdown_ticks == 0 {
            return Err(GameError::Validation(
                "crash.countdown_ticks must be at least 1".to_string(),
            ));
        }
        if self.crash.run_tick_ms == 0 {
            return Err(GameError::Validation(
                "crash.run_tick_ms must be nonzero".to_string(),
            ));
        }
        if self.crash.multiplier_step == 0 {
            return Err(GameError::Validation(
                "crash.multiplier_step must be nonzero".to_string(),
            ));
        }
        if self.crash.history_limit == 0 {
            return Err(GameError::Validation(
                "crash.history_limit must be nonzero".to_string(),
            ));
        }
        if self.auth.token_secret.is_empty() {
            return Err(GameError::Validation(
                "auth.token_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = CroupierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.crash.countdown_ticks, 5);
        assert_eq!(config.crash.restart_delay_ms, 3_000);
        assert_eq!(config.crash.history_limit, 20);
    }

    #[test]
    fn rejects_zero_step() {
        let mut config = CroupierConfig::default();
        config.crash.multiplier_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: CroupierConfig = toml::from_str(
            r#"
            [server]
            port = 4000
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.crash.countdown_ticks, 5);
    }
}
