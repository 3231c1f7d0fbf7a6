//! Viewport framing for the current selection

use tracing::debug;

use crate::config::MapConfig;
use crate::models::{Location, MapViewport};
use crate::projection::{MapPoint, MapRect};

/// Half the side of the square each selected location contributes, in map units
pub const DEFAULT_BOX_HALF_SIZE: f64 = 100_000.0;

/// Factor applied to both span components around the framed locations
pub const DEFAULT_SPAN_PADDING: f64 = 1.5;

/// Computes the map region framing a set of selected locations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportCalculator {
    box_half_size: f64,
    span_padding: f64,
}

impl Default for ViewportCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_BOX_HALF_SIZE, DEFAULT_SPAN_PADDING)
    }
}

impl ViewportCalculator {
    #[must_use]
    pub fn new(box_half_size: f64, span_padding: f64) -> Self {
        Self {
            box_half_size,
            span_padding,
        }
    }

    #[must_use]
    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.box_half_size, config.span_padding)
    }

    /// Region framing `selected`, or `previous` when nothing is selected.
    #[must_use]
    pub fn compute_viewport<'a, I>(&self, selected: I, previous: MapViewport) -> MapViewport
    where
        I: IntoIterator<Item = &'a Location>,
    {
        match self.unpadded_region(selected) {
            Some(mut region) => {
                region.span = region.span.scaled(self.span_padding);
                debug!(
                    "Framed selection at ({:.4}, {:.4}) span {:.4}x{:.4}",
                    region.center.latitude,
                    region.center.longitude,
                    region.span.latitude_delta,
                    region.span.longitude_delta
                );
                region
            }
            None => previous,
        }
    }

    /// Region covering the union of the per-location boxes, before padding.
    /// `None` for an empty selection.
    #[must_use]
    pub fn unpadded_region<'a, I>(&self, selected: I) -> Option<MapViewport>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        selected
            .into_iter()
            .map(|location| {
                let point = MapPoint::from_coordinate(&location.coordinate);
                MapRect::centered_square(point, self.box_half_size)
            })
            .reduce(|acc, rect| acc.union(&rect))
            .map(|rect| rect.to_region())
    }
}
