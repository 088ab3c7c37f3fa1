//! Environment configuration
//!
//! All knobs come from environment variables, read once at startup. A
//! missing `ENDPOINT` is the one unrecoverable configuration error: the
//! process reports it and exits nonzero before serving anything.

use std::env;
use std::time::Duration;

/// Configuration error; fatal before the server starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Runtime configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chain environment tag (`devnet`, `mainnet-beta`, ...).
    pub env: String,
    /// JSON-RPC endpoint. Required.
    pub endpoint: String,
    /// Websocket endpoint; defaults to the RPC endpoint with a ws scheme.
    pub ws_endpoint: String,
    /// HTTP listen port.
    pub port: u16,
    /// Push subscription instead of polling.
    pub use_websocket: bool,
    /// Compact order stream instead of the full user map.
    pub use_order_subscriber: bool,
    /// Per-IP request budget per second.
    pub rate_limit_calls_per_second: u32,
    /// Whether the load-test user agent bypasses the limiter.
    pub allow_load_test: bool,
    /// Build commit, reported verbatim.
    pub commit: String,
    /// Book rebuild interval.
    pub tick_interval: Duration,
    /// Account polling interval in polling mode.
    pub polling_interval: Duration,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("ENDPOINT").map_err(|_| ConfigError::MissingVar("ENDPOINT"))?;
        let ws_endpoint = env::var("WS_ENDPOINT").unwrap_or_else(|_| {
            endpoint
                .replacen("https://", "wss://", 1)
                .replacen("http://", "ws://", 1)
        });

        Ok(Self {
            env: env::var("ENV").unwrap_or_else(|_| "devnet".to_string()),
            endpoint,
            ws_endpoint,
            port: parse_var("PORT", 6969)?,
            use_websocket: parse_bool("USE_WEBSOCKET"),
            use_order_subscriber: parse_bool("USE_ORDER_SUBSCRIBER"),
            rate_limit_calls_per_second: parse_var("RATE_LIMIT_CALLS_PER_SECOND", 1)?,
            allow_load_test: parse_bool("ALLOW_LOAD_TEST"),
            commit: env::var("COMMIT").unwrap_or_default(),
            tick_interval: Duration::from_millis(1000),
            polling_interval: Duration::from_millis(1000),
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(var: &str) -> bool {
    matches!(
        env::var(var).unwrap_or_default().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test: env vars are process-global and tests run in parallel.
    #[test]
    fn test_env_loading() {
        env::remove_var("ENDPOINT");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("ENDPOINT")));

        env::set_var("ENDPOINT", "https://rpc.example.org");
        env::remove_var("WS_ENDPOINT");
        env::remove_var("PORT");
        env::remove_var("ENV");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 6969);
        assert_eq!(config.env, "devnet");
        assert_eq!(config.ws_endpoint, "wss://rpc.example.org");
        assert_eq!(config.rate_limit_calls_per_second, 1);
        assert!(!config.use_websocket);

        env::set_var("PORT", "8080");
        env::set_var("USE_ORDER_SUBSCRIBER", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.use_order_subscriber);

        env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());
        env::remove_var("PORT");
        env::remove_var("USE_ORDER_SUBSCRIBER");
    }
}
