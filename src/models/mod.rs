//! Data models for the PlaceMap core
//!
//! This module contains the domain value types:
//! - Location: named points with generated identity
//! - Region: the visible map area (center + span)

pub mod location;
pub mod region;

pub use location::{Coordinate, Location, LocationId};
pub use region::{MapViewport, Span};
