//! Open-Meteo geocoding client
//!
//! The Open-Meteo search endpoint needs no API key. It has no notion of a
//! bias region, so results inside the requested region are moved to the
//! front client-side.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{Candidate, GeocodeRequest, Geocoder, prefer_region};
use crate::config::GeocodingConfig;
use crate::models::Coordinate;
use crate::{PlaceMapError, Result};

/// Geocoding response from Open-Meteo
#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    country: Option<String>,
    admin1: Option<String>,
}

impl From<GeocodingResult> for Candidate {
    fn from(result: GeocodingResult) -> Self {
        let coordinate = match (result.latitude, result.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        };
        Self {
            name: result.name,
            region_label: result.country.or(result.admin1),
            coordinate,
        }
    }
}

/// Parse a raw Open-Meteo search body into candidates
fn parse_response(body: &str) -> anyhow::Result<Vec<Candidate>> {
    let response: GeocodingResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo geocoding response")?;
    Ok(response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(Candidate::from)
        .collect())
}

pub struct OpenMeteoGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
    max_results: u32,
    language: String,
}

impl OpenMeteoGeocoder {
    /// Create a new geocoding client
    ///
    /// # Errors
    /// The underlying HTTP client could not be built.
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("PlaceMap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlaceMapError::geocoding(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
            language: config.language.clone(),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?name={}&count={}&language={}&format=json",
            self.base_url,
            urlencoding::encode(query),
            self.max_results,
            urlencoding::encode(&self.language)
        )
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self, request), fields(query = %request.query))]
    async fn search(&self, request: &GeocodeRequest) -> Result<Vec<Candidate>> {
        let start_time = Instant::now();
        let url = self.search_url(&request.query);
        debug!("Open-Meteo geocoding request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlaceMapError::geocoding(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoding request for '{}' returned {}", request.query, status);
            return Err(PlaceMapError::geocoding(format!(
                "Open-Meteo returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlaceMapError::geocoding(format!("Failed to read response: {e}")))?;
        let mut candidates =
            parse_response(&body).map_err(|e| PlaceMapError::geocoding(format!("{e:#}")))?;

        if let Some(region) = &request.bias_region {
            prefer_region(&mut candidates, region);
        }

        if candidates.is_empty() {
            warn!("No results found for '{}'", request.query);
        } else {
            info!(
                "Found {} geocoding results for '{}' in {:.3}s",
                candidates.len(),
                request.query,
                start_time.elapsed().as_secs_f64()
            );
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_result() {
        let body = r#"{
            "results": [
                {"id": 2988507, "name": "Paris", "latitude": 48.85341, "longitude": 2.3488,
                 "country": "France", "admin1": "Île-de-France", "timezone": "Europe/Paris"}
            ],
            "generationtime_ms": 0.9
        }"#;
        let candidates = parse_response(body).unwrap();
        assert_eq!(candidates, vec![Candidate::new("Paris", "France", 48.85341, 2.3488)]);
    }

    #[test]
    fn test_parse_missing_results_is_empty() {
        let candidates = parse_response(r#"{"generationtime_ms": 0.2}"#).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_parse_falls_back_to_admin_region() {
        let body = r#"{"results": [{"name": "Atlantis", "latitude": 1.0, "longitude": 2.0, "admin1": "Ocean"}]}"#;
        let candidates = parse_response(body).unwrap();
        assert_eq!(candidates[0].region_label.as_deref(), Some("Ocean"));
    }

    #[test]
    fn test_parse_partial_coordinate() {
        let body = r#"{"results": [{"name": "Half", "latitude": 1.0, "country": "X"}]}"#;
        let candidates = parse_response(body).unwrap();
        assert!(candidates[0].coordinate.is_none());
    }

    #[test]
    fn test_parse_invalid_body() {
        assert!(parse_response("<html>").is_err());
    }

    #[test]
    fn test_search_url_encodes_query() {
        let geocoder = OpenMeteoGeocoder::new(&GeocodingConfig::default()).unwrap();
        let url = geocoder.search_url("São Paulo");
        assert!(url.starts_with("https://geocoding-api.open-meteo.com/v1/search?name=S%C3%A3o%20Paulo"));
        assert!(url.contains("&count=5&language=en&format=json"));
    }
}
