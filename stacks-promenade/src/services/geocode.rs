//! Geocoding client
//!
//! Turns a visitor's address or zip code into coordinates for the
//! nearest-location list, and coordinates back into a zip code.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("stacks-promenade/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Latitude and longitude for a free-form address
    async fn geocode_address(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError>;

    /// Postal code containing a point
    async fn get_zip_code(&self, latitude: f64, longitude: f64)
        -> Result<Option<String>, GeocodeError>;
}

/// Used when no API key is configured; every lookup finds nothing
pub struct DisabledGeocodingClient;

#[async_trait]
impl GeocodingClient for DisabledGeocodingClient {
    async fn geocode_address(&self, _address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        Ok(None)
    }

    async fn get_zip_code(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Option<String>, GeocodeError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Google Maps geocoding API
pub struct GoogleGeocodingClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocodingClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("key", self.api_key.as_str()));

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::ApiError(status.as_u16(), error_text));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;

        match body.status.as_str() {
            "OK" => Ok(body.results),
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(GeocodeError::ApiError(
                status.as_u16(),
                body.error_message.unwrap_or_else(|| other.to_string()),
            )),
        }
    }
}

#[async_trait]
impl GeocodingClient for GoogleGeocodingClient {
    async fn geocode_address(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        tracing::debug!(address = %address, "Geocoding address");

        let results = self.query(&[("address", address)]).await?;
        Ok(results
            .first()
            .map(|r| (r.geometry.location.lat, r.geometry.location.lng)))
    }

    async fn get_zip_code(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, GeocodeError> {
        let latlng = format!("{},{}", latitude, longitude);
        let results = self
            .query(&[("latlng", latlng.as_str()), ("result_type", "postal_code")])
            .await?;

        Ok(results
            .iter()
            .flat_map(|r| r.address_components.iter())
            .find(|c| c.types.iter().any(|t| t == "postal_code"))
            .map(|c| c.short_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geocode_response() {
        let json = r#"{
            "status": "OK",
            "results": [{
                "geometry": {"location": {"lat": 33.45, "lng": -112.07}},
                "address_components": [
                    {"long_name": "Phoenix", "short_name": "Phoenix", "types": ["locality"]},
                    {"long_name": "85004", "short_name": "85004", "types": ["postal_code"]}
                ]
            }]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "OK");
        assert_eq!(response.results[0].geometry.location.lat, 33.45);
        assert_eq!(response.results[0].address_components[1].short_name, "85004");
    }

    #[tokio::test]
    async fn test_disabled_client_finds_nothing() {
        let client = DisabledGeocodingClient;
        assert!(client.geocode_address("85004").await.unwrap().is_none());
        assert!(client.get_zip_code(33.0, -112.0).await.unwrap().is_none());
    }
}
