//! HTTP client for the assessment service.
//!
//! [`AssessmentClient`] implements [`AssessmentApi`] over the JSON contract
//! served at `/api/assessment/*`, so a
//! [`PhaseController`](assessment_core::PhaseController) can drive a real
//! service. Every call is a single request: no retries, no caching.
//! [`NominatimGeocoder`] provides the best-effort postcode lookup.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use assessment_client::AssessmentClient;
//! use assessment_core::{PhaseController, Registration};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AssessmentClient::new()?;
//! let mut flow = PhaseController::new(Arc::new(client));
//! flow.start(&Registration {
//!     name: "Asha".to_owned(),
//!     phone: "9999999999".to_owned(),
//!     email: "asha@example.com".to_owned(),
//!     terms_accepted: true,
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`AssessmentApi`]: assessment_core::AssessmentApi

mod client;
mod error;
mod geocode;
mod types;

pub use error::ClientError;
pub use geocode::NominatimGeocoder;

use std::time::Duration;

/// Service address used when neither the config nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable consulted for the service address.
pub const BASE_URL_ENV: &str = "ASSESSMENT_API_BASE_URL";

/// Reverse geocoder used when neither the config nor the environment names one.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Environment variable consulted for the reverse geocoder address.
pub const GEOCODER_URL_ENV: &str = "ASSESSMENT_GEOCODER_URL";

const DEFAULT_USER_AGENT: &str = concat!("assessment-client/", env!("CARGO_PKG_VERSION"));

/// Configuration for the assessment client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Service base URL. Empty means `ASSESSMENT_API_BASE_URL`, then
    /// `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout. Default: none.
    pub timeout: Option<Duration>,
    /// `User-Agent` header. Empty means `assessment-client/<version>`.
    pub user_agent: String,
}

/// Assessment service client.
#[derive(Debug, Clone)]
pub struct AssessmentClient {
    base_url: String,
    client: reqwest::Client,
}
