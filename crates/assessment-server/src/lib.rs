//! Assessment HTTP server.
//!
//! Serves the assessment contract at `/api/assessment/*`: registration with
//! OTP issue, OTP verification, the four-step question catalog, per-step
//! answer persistence, and a session summary with digital-maturity scores.
//! Sessions live in memory and are evicted after a period of inactivity.

pub mod catalog;
pub mod config;
pub mod delivery;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
