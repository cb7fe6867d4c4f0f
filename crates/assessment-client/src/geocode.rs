//! Reverse geocoding through a Nominatim-compatible service.

use tracing::debug;

use assessment_core::api::LocationLookup;

use crate::client::resolve_url;
use crate::error::ClientError;
use crate::types::ReverseGeocode;
use crate::{DEFAULT_GEOCODER_URL, DEFAULT_USER_AGENT, GEOCODER_URL_ENV};

/// Postcode lookup against `{base}/reverse?format=json`.
///
/// Lookups never fail loudly: any network, status or decoding problem
/// yields `None` and the field stays as the user left it.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    /// Create a geocoder. An empty `base_url` falls back to
    /// `ASSESSMENT_GEOCODER_URL`, then the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = resolve_url(
            base_url,
            &std::env::var(GEOCODER_URL_ENV).unwrap_or_default(),
            DEFAULT_GEOCODER_URL,
        );
        // Nominatim's usage policy requires an identifying agent.
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { base_url, client })
    }

    /// The resolved geocoder base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, ClientError> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_owned()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status_code: status.as_u16(),
            });
        }

        let body: ReverseGeocode = resp.json().await?;
        Ok(body.postcode())
    }
}

#[async_trait::async_trait]
impl LocationLookup for NominatimGeocoder {
    async fn postcode(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.lookup(latitude, longitude).await {
            Ok(postcode) => postcode,
            Err(e) => {
                debug!(error = %e, "reverse geocoding failed");
                None
            }
        }
    }
}
