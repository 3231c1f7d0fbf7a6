//! Visible map region expressed as a center plus latitude/longitude span

use serde::{Deserialize, Serialize};

use super::location::Coordinate;

/// Extent of a region in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Span {
    #[must_use]
    pub fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }

    /// Multiply both deltas by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.latitude_delta * factor, self.longitude_delta * factor)
    }
}

/// The visible map area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub center: Coordinate,
    pub span: Span,
}

impl MapViewport {
    #[must_use]
    pub fn new(center: Coordinate, span: Span) -> Self {
        Self { center, span }
    }

    /// Checks if the region covers a coordinate, wrapping across the
    /// antimeridian
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        let half_lat = self.span.latitude_delta / 2.0;
        let half_lon = self.span.longitude_delta / 2.0;
        let lon_offset =
            (coordinate.longitude - self.center.longitude + 180.0).rem_euclid(360.0) - 180.0;
        (coordinate.latitude - self.center.latitude).abs() <= half_lat
            && lon_offset.abs() <= half_lon
    }
}
