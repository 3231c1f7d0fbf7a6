//! `PlaceMap` - location search and map framing core
//!
//! This library holds the behaviour behind a two-pane place browser:
//! searching for places (locally or through a geocoding provider),
//! keeping the ordered list and its selection, and computing the map
//! region that frames the selection.

pub mod config;
pub mod driver;
pub mod error;
pub mod geocoding;
pub mod models;
pub mod preferences;
pub mod projection;
pub mod search;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod viewport;

// Re-export core types for public API
pub use config::PlaceMapConfig;
pub use driver::{Command, SessionHandle, StoreSnapshot};
pub use error::PlaceMapError;
pub use geocoding::{Candidate, GeocodeRequest, Geocoder, OpenMeteoGeocoder};
pub use models::{Coordinate, Location, LocationId, MapViewport, Span};
pub use preferences::{FjallPreferences, MemoryPreferences, PreferenceStore};
pub use search::{SearchCoordinator, SearchOutcome};
pub use session::MapSession;
pub use store::{LocationStore, StoreEvent};
pub use viewport::ViewportCalculator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlaceMapError>;
