//! Server configuration for the assessment service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `ASSESSMENT_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listener when neither `ASSESSMENT_BIND_ADDR` nor `PORT` is set.
const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Lifetime of an issued OTP.
    pub otp_ttl: Duration,
    /// Sessions idle for longer than this are evicted.
    pub session_ttl: Duration,
    /// Interval between idle-session sweeps.
    pub sweep_interval: Duration,
    /// Log issued OTP codes in place of SMS/e-mail delivery.
    pub log_otp: bool,
    /// Maximum concurrent requests on the start endpoint.
    pub start_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND),
            log_level: "info".to_owned(),
            otp_ttl: Duration::from_secs(300),
            session_ttl: Duration::from_secs(86_400),
            sweep_interval: Duration::from_secs(60),
            log_otp: false,
            start_concurrency: 32,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `ASSESSMENT_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8000`)
    /// - `ASSESSMENT_LOG_LEVEL`: log filter (default: `info`)
    /// - `ASSESSMENT_OTP_TTL`: OTP lifetime in seconds (default: `300`)
    /// - `ASSESSMENT_SESSION_TTL`: idle session lifetime in seconds (default: `86400`)
    /// - `ASSESSMENT_SWEEP_INTERVAL`: seconds between idle-session sweeps (default: `60`)
    /// - `ASSESSMENT_LOG_OTP`: log issued OTP codes (default: `false`)
    /// - `ASSESSMENT_START_CONCURRENCY`: concurrent start requests (default: `32`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Priority: ASSESSMENT_BIND_ADDR > PORT > default 127.0.0.1:8000
        let bind_addr = if let Some(addr) = lookup("ASSESSMENT_BIND_ADDR") {
            addr.parse().unwrap_or(defaults.bind_addr)
        } else if let Some(port_str) = lookup("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_BIND.1);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            defaults.bind_addr
        };

        let log_level = lookup("ASSESSMENT_LOG_LEVEL").unwrap_or(defaults.log_level);

        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map_or(default, Duration::from_secs)
        };

        let log_otp = lookup("ASSESSMENT_LOG_OTP").is_some_and(|v| v == "true" || v == "1");

        let start_concurrency = lookup("ASSESSMENT_START_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.start_concurrency);

        Self {
            bind_addr,
            log_level,
            otp_ttl: secs("ASSESSMENT_OTP_TTL", defaults.otp_ttl),
            session_ttl: secs("ASSESSMENT_SESSION_TTL", defaults.session_ttl),
            sweep_interval: secs("ASSESSMENT_SWEEP_INTERVAL", defaults.sweep_interval),
            log_otp,
            start_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8000)));
        assert_eq!(cfg.otp_ttl, Duration::from_secs(300));
        assert_eq!(cfg.session_ttl, Duration::from_secs(86_400));
        assert!(!cfg.log_otp);
    }

    #[test]
    fn bind_addr_overrides_port() {
        let cfg = config(&[("ASSESSMENT_BIND_ADDR", "10.0.0.1:9000"), ("PORT", "7000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([10, 0, 0, 1], 9000)));

        let cfg = config(&[("PORT", "7000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 7000)));
    }

    #[test]
    fn invalid_durations_fall_back() {
        let cfg = config(&[
            ("ASSESSMENT_OTP_TTL", "soon"),
            ("ASSESSMENT_SESSION_TTL", "0"),
            ("ASSESSMENT_SWEEP_INTERVAL", "5"),
            ("ASSESSMENT_LOG_OTP", "true"),
        ]);
        assert_eq!(cfg.otp_ttl, Duration::from_secs(300));
        assert_eq!(cfg.session_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(5));
        assert!(cfg.log_otp);
    }
}
