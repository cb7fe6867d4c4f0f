//! Wire types private to the client.

use serde::Deserialize;

// --- Reverse geocoding response ---

#[derive(Debug, Deserialize)]
pub(crate) struct ReverseGeocode {
    #[serde(default)]
    pub address: Option<GeocodedAddress>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodedAddress {
    #[serde(default)]
    pub postcode: Option<String>,
}

impl ReverseGeocode {
    /// The non-blank postal code, if the lookup produced one.
    pub fn postcode(self) -> Option<String> {
        self.address
            .and_then(|a| a.postcode)
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
    }
}
