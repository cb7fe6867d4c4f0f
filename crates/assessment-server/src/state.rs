//! Shared application state for the assessment server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the session store, the question
//! catalog, and the OTP delivery backend.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::ServerConfig;
use crate::delivery::{LogDelivery, OtpDelivery};
use crate::session::SessionStore;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Live assessment sessions.
    pub sessions: SessionStore,
    /// Step definitions served to clients.
    pub catalog: Catalog,
    /// Where issued OTPs are sent.
    pub delivery: Arc<dyn OtpDelivery>,
}

impl AppState {
    /// State with log-based OTP delivery.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_delivery(
            config,
            Arc::new(LogDelivery {
                reveal: config.log_otp,
            }),
        )
    }

    #[must_use]
    pub fn with_delivery(config: &ServerConfig, delivery: Arc<dyn OtpDelivery>) -> Self {
        Self {
            sessions: SessionStore::new(config.otp_ttl),
            catalog: Catalog::standard(),
            delivery,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
