//! Reverse geocoding: convert coordinates to the name of the nearest place.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::types::{ApiError, Coordinates};

/// Resolves a position to a place name; `None` when nothing usable came back.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve_place(&self, coordinates: Coordinates) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    municipality: Option<String>,
}

impl NominatimAddress {
    /// city > town > village > county > state > municipality, skipping blanks
    fn place_name(self) -> Option<String> {
        [
            self.city,
            self.town,
            self.village,
            self.county,
            self.state,
            self.municipality,
        ]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    reverse_url: Url,
    client: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let reverse_url = base.join("reverse")?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            reverse_url,
            client,
        })
    }

    /// Reverse geocode coordinates to a place name.
    /// Returns `None` on any failure; callers treat that as "keep what you had".
    pub async fn reverse_geocode(&self, coordinates: Coordinates) -> Option<String> {
        let response = match self
            .client
            .get(self.reverse_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.lat.to_string()),
                ("lon", coordinates.lon.to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let place = body.address?.place_name()?;
        tracing::info!("Reverse geocoded to: {}", place);
        Some(place)
    }
}

#[async_trait]
impl PlaceResolver for NominatimGeocoder {
    async fn resolve_place(&self, coordinates: Coordinates) -> Option<String> {
        self.reverse_geocode(coordinates).await
    }
}
