//! Forward geocoding: free-text location to coordinates plus a canonical
//! formatted address. First-match policy: only `results[0]` is ever used,
//! and an empty result set is a checked error.

use axum::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Couldn't find that location, try a different search")]
    NoResults,
    #[error("Location lookup failed, try again later")]
    Provider(String),
}

/// A resolved place. The three fields always come from the same geocoding
/// result and are persisted together.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, address: &str) -> Result<GeocodedPlace, GeocodeError>;
}

// --- wire types ---

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
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

impl GeocodeResponse {
    fn into_place(self) -> Result<GeocodedPlace, GeocodeError> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => return Err(GeocodeError::Provider(format!("provider status {other}"))),
        }
        let first = self.results.into_iter().next().ok_or(GeocodeError::NoResults)?;
        Ok(GeocodedPlace {
            lat: first.geometry.location.lat,
            lng: first.geometry.location.lng,
            formatted_address: first.formatted_address,
        })
    }
}

// --- HTTP implementation ---

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct HttpGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl HttpGeocoder {
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn forward(&self, address: &str) -> Result<GeocodedPlace, GeocodeError> {
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", address), ("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::Provider(format!("http {}", response.status())));
        }
        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;
        body.into_place()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_result_wins() {
        let body = r#"{
            "status": "OK",
            "results": [
                {
                    "formatted_address": "Yosemite National Park, CA",
                    "geometry": { "location": { "lat": 37.87, "lng": -119.54 } }
                },
                {
                    "formatted_address": "Yosemite Village, CA 95389",
                    "geometry": { "location": { "lat": 37.74, "lng": -119.58 } }
                }
            ]
        }"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        let place = parsed.into_place().unwrap();
        assert_eq!(
            place,
            GeocodedPlace {
                lat: 37.87,
                lng: -119.54,
                formatted_address: "Yosemite National Park, CA".into(),
            }
        );
    }

    #[test]
    fn empty_results_is_an_error_not_a_panic() {
        let body = r#"{ "status": "ZERO_RESULTS", "results": [] }"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed.into_place(), Err(GeocodeError::NoResults)));
    }

    #[test]
    fn provider_status_errors_propagate() {
        let body = r#"{ "status": "OVER_QUERY_LIMIT", "results": [] }"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        match parsed.into_place() {
            Err(GeocodeError::Provider(msg)) => assert!(msg.contains("OVER_QUERY_LIMIT")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn missing_results_key_defaults_to_empty() {
        let body = r#"{ "status": "OK" }"#;
        let parsed: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed.into_place(), Err(GeocodeError::NoResults)));
    }
}
