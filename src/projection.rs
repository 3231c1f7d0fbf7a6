//! Flat map projection used for framing selections.
//!
//! Coordinates are projected with spherical Mercator onto a square world
//! of `WORLD_SIZE` map units per side. The origin is the north-west
//! corner and `y` grows southwards, so distances along either axis are
//! measured in the same unit regardless of latitude.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::models::{Coordinate, MapViewport, Span};

/// Width and height of the projected world in map units (256 * 2^20)
pub const WORLD_SIZE: f64 = 268_435_456.0;

/// Latitudes beyond this cannot be represented in spherical Mercator
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// A point in projected map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Project a geographic coordinate
    #[must_use]
    pub fn from_coordinate(coordinate: &Coordinate) -> Self {
        let lat = coordinate.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (coordinate.longitude + 180.0) / 360.0 * WORLD_SIZE;
        let y = (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI)) * WORLD_SIZE;
        Self::new(x, y)
    }

    /// Inverse projection back to latitude/longitude
    #[must_use]
    pub fn to_coordinate(&self) -> Coordinate {
        let longitude = self.x / WORLD_SIZE * 360.0 - 180.0;
        let n = PI * (1.0 - 2.0 * self.y / WORLD_SIZE);
        let latitude = (2.0 * n.exp().atan() - PI / 2.0).to_degrees();
        Coordinate::new(latitude, longitude)
    }
}

/// Axis-aligned rectangle in projected map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRect {
    pub origin: MapPoint,
    pub width: f64,
    pub height: f64,
}

impl MapRect {
    #[must_use]
    pub fn new(origin: MapPoint, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Square of side `2 * half_size` centred on `center`
    #[must_use]
    pub fn centered_square(center: MapPoint, half_size: f64) -> Self {
        Self::new(
            MapPoint::new(center.x - half_size, center.y - half_size),
            half_size * 2.0,
            half_size * 2.0,
        )
    }

    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.origin.x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.origin.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> MapPoint {
        MapPoint::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }

    /// Smallest rectangle covering both rectangles
    #[must_use]
    pub fn union(&self, other: &MapRect) -> MapRect {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        MapRect::new(MapPoint::new(min_x, min_y), max_x - min_x, max_y - min_y)
    }

    /// Geographic region covered by this rectangle.
    ///
    /// The latitude delta is measured between the north and south edges,
    /// so it shrinks towards the poles for a rectangle of fixed height.
    #[must_use]
    pub fn to_region(&self) -> MapViewport {
        let north = MapPoint::new(self.min_x(), self.min_y()).to_coordinate();
        let south = MapPoint::new(self.min_x(), self.max_y()).to_coordinate();
        let center = self.center().to_coordinate();

        let span = Span::new(
            north.latitude - south.latitude,
            self.width / WORLD_SIZE * 360.0,
        );
        MapViewport::new(center, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_round_trip() {
        let coordinate = Coordinate::new(51.5, -0.12);
        let back = MapPoint::from_coordinate(&coordinate).to_coordinate();
        assert!((back.latitude - coordinate.latitude).abs() < 1e-9);
        assert!((back.longitude - coordinate.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_origin_is_north_west() {
        let point = MapPoint::from_coordinate(&Coordinate::new(0.0, 0.0));
        assert!((point.x - WORLD_SIZE / 2.0).abs() < 1e-6);
        assert!((point.y - WORLD_SIZE / 2.0).abs() < 1e-6);

        let north = MapPoint::from_coordinate(&Coordinate::new(60.0, 0.0));
        assert!(north.y < point.y);
    }

    #[test]
    fn test_union_covers_both() {
        let a = MapRect::centered_square(MapPoint::new(0.0, 0.0), 10.0);
        let b = MapRect::centered_square(MapPoint::new(100.0, 50.0), 10.0);
        let union = a.union(&b);
        assert_eq!(union.min_x(), -10.0);
        assert_eq!(union.min_y(), -10.0);
        assert_eq!(union.max_x(), 110.0);
        assert_eq!(union.max_y(), 60.0);
    }

    #[test]
    fn test_region_of_square_at_equator() {
        let center = MapPoint::from_coordinate(&Coordinate::new(0.0, 10.0));
        let region = MapRect::centered_square(center, 100_000.0).to_region();
        let expected_lon_delta = 200_000.0 / WORLD_SIZE * 360.0;
        assert!((region.span.longitude_delta - expected_lon_delta).abs() < 1e-12);
        assert!((region.span.latitude_delta - expected_lon_delta).abs() < 1e-6);
        assert!(region.center.latitude.abs() < 1e-9);
        assert!((region.center.longitude - 10.0).abs() < 1e-9);
    }
}
