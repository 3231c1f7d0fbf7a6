//! Location model for named geographic points of interest

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Opaque identifier generated when a location is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(Uuid);

impl LocationId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Validates that the coordinate is within valid ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named place shown as a pin on the map and a row in the list.
///
/// Equality and hashing look only at the identifier: two locations with
/// the same name and coordinate are still distinct entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    /// Display name
    pub name: String,
    /// Country or region label
    pub country: String,
    /// Position of the pin
    pub coordinate: Coordinate,
}

impl Location {
    /// Create a new location with a freshly generated identifier
    #[must_use]
    pub fn new(name: String, country: String, coordinate: Coordinate) -> Self {
        Self::with_id(LocationId::new(), name, country, coordinate)
    }

    /// Create a location with an explicit identifier
    #[must_use]
    pub fn with_id(id: LocationId, name: String, country: String, coordinate: Coordinate) -> Self {
        Self {
            id,
            name,
            country,
            coordinate,
        }
    }

    #[must_use]
    pub fn id(&self) -> LocationId {
        self.id
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }

    /// Case-insensitive "name contains" test used for local search hits
    #[must_use]
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude(), self.longitude())
    }

    /// Secondary label shown under the name on a pin
    #[must_use]
    pub fn subtitle(&self) -> &str {
        &self.country
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
