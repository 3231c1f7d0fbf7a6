//! Geocoding provider boundary
//!
//! The search coordinator only talks to a [`Geocoder`]. The bundled
//! implementation is [`open_meteo::OpenMeteoGeocoder`]; tests and
//! embedding applications can supply their own.

pub mod open_meteo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{Coordinate, MapViewport};

pub use open_meteo::OpenMeteoGeocoder;

/// One place returned by a provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: Option<String>,
    pub region_label: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl Candidate {
    #[must_use]
    pub fn new(name: &str, region_label: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            region_label: Some(region_label.to_string()),
            coordinate: Some(Coordinate::new(latitude, longitude)),
        }
    }
}

/// Free-text lookup, optionally biased towards the visible region
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeRequest {
    pub query: String,
    pub bias_region: Option<MapViewport>,
}

/// External place search service
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate places for `request`, best match first.
    ///
    /// # Errors
    /// Network or provider failures.
    async fn search(&self, request: &GeocodeRequest) -> Result<Vec<Candidate>>;
}

/// Stable reorder putting candidates inside `region` first
pub fn prefer_region(candidates: &mut [Candidate], region: &MapViewport) {
    candidates.sort_by_key(|candidate| match &candidate.coordinate {
        Some(coordinate) if region.contains(coordinate) => 0,
        _ => 1,
    });
}
