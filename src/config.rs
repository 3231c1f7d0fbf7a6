//! Configuration management for the `PlaceMap` core
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::{PlaceMapError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Coordinate, MapViewport, Span};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceMapConfig {
    /// Geocoding provider configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Initial camera and selection framing
    #[serde(default)]
    pub map: MapConfig,
    /// Persisted preference storage
    #[serde(default)]
    pub preferences: PreferencesConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of the Open-Meteo geocoding API
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Upper bound on how long one search may take, in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient HTTP failures
    #[serde(default = "default_geocoding_max_retries")]
    pub max_retries: u32,
    /// Number of candidates requested from the provider
    #[serde(default = "default_geocoding_max_results")]
    pub max_results: u32,
    /// Language for returned place names
    #[serde(default = "default_geocoding_language")]
    pub language: String,
}

/// Map framing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_initial_latitude")]
    pub initial_latitude: f64,
    #[serde(default = "default_initial_longitude")]
    pub initial_longitude: f64,
    /// Initial latitude and longitude span in degrees
    #[serde(default = "default_initial_span")]
    pub initial_span_degrees: f64,
    /// Half side of the box framed around each selected location, in map units
    #[serde(default = "default_box_half_size")]
    pub box_half_size: f64,
    /// Span multiplier applied around the framed locations
    #[serde(default = "default_span_padding")]
    pub span_padding: f64,
}

/// Preference storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Directory of the preference database
    #[serde(default = "default_preferences_path")]
    pub path: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_geocoding_timeout() -> u32 {
    5
}

fn default_geocoding_max_retries() -> u32 {
    2
}

fn default_geocoding_max_results() -> u32 {
    5
}

fn default_geocoding_language() -> String {
    "en".to_string()
}

fn default_initial_latitude() -> f64 {
    51.507222
}

fn default_initial_longitude() -> f64 {
    -0.1275
}

fn default_initial_span() -> f64 {
    1.0
}

fn default_box_half_size() -> f64 {
    crate::viewport::DEFAULT_BOX_HALF_SIZE
}

fn default_span_padding() -> f64 {
    crate::viewport::DEFAULT_SPAN_PADDING
}

fn default_preferences_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("placemap").join("prefs"))
        .unwrap_or_else(|| PathBuf::from(".placemap/prefs"))
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_geocoding_timeout(),
            max_retries: default_geocoding_max_retries(),
            max_results: default_geocoding_max_results(),
            language: default_geocoding_language(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_latitude: default_initial_latitude(),
            initial_longitude: default_initial_longitude(),
            initial_span_degrees: default_initial_span(),
            box_half_size: default_box_half_size(),
            span_padding: default_span_padding(),
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GeocodingConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl MapConfig {
    /// Camera position at session start
    #[must_use]
    pub fn initial_viewport(&self) -> MapViewport {
        MapViewport::new(
            Coordinate::new(self.initial_latitude, self.initial_longitude),
            Span::new(self.initial_span_degrees, self.initial_span_degrees),
        )
    }
}

impl PlaceMapConfig {
    /// Load configuration from file and environment variables
    ///
    /// # Errors
    /// The sources could not be read or the result fails validation.
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// # Errors
    /// The sources could not be read or the result fails validation.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides such as PLACEMAP_GEOCODING__TIMEOUT_SECONDS
        builder = builder.add_source(
            Environment::with_prefix("PLACEMAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PlaceMapError::config(format!("Failed to build configuration: {e}")))?;

        let mut config: PlaceMapConfig = settings.try_deserialize().map_err(|e| {
            PlaceMapError::config(format!("Failed to deserialize configuration: {e}"))
        })?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("placemap").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.geocoding.max_results == 0 {
            self.geocoding.max_results = default_geocoding_max_results();
        }
        if self.geocoding.language.is_empty() {
            self.geocoding.language = default_geocoding_language();
        }
        if self.preferences.path.is_empty() {
            self.preferences.path = default_preferences_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    ///
    /// # Errors
    /// The first setting found out of range.
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoding.timeout_seconds > 60 {
            return Err(PlaceMapError::config(
                "Geocoding timeout cannot exceed 60 seconds",
            ));
        }

        if self.geocoding.max_retries > 10 {
            return Err(PlaceMapError::config(
                "Geocoding max retries cannot exceed 10",
            ));
        }

        if !(1..=100).contains(&self.geocoding.max_results) {
            return Err(PlaceMapError::config(
                "Geocoding max results must be between 1 and 100",
            ));
        }

        let map = &self.map;
        if !map.initial_viewport().center.is_valid() {
            return Err(PlaceMapError::config(
                "Initial map center must be a valid latitude/longitude",
            ));
        }

        if !(map.initial_span_degrees > 0.0 && map.initial_span_degrees <= 180.0) {
            return Err(PlaceMapError::config(
                "Initial span must be greater than 0 and at most 180 degrees",
            ));
        }

        if !(map.box_half_size.is_finite() && map.box_half_size > 0.0) {
            return Err(PlaceMapError::config("Box half size must be positive"));
        }

        if !(map.span_padding.is_finite() && map.span_padding >= 1.0) {
            return Err(PlaceMapError::config(
                "Span padding must be at least 1.0",
            ));
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlaceMapError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlaceMapError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        if !self.geocoding.base_url.starts_with("http://")
            && !self.geocoding.base_url.starts_with("https://")
        {
            return Err(PlaceMapError::config(
                "Geocoding base URL must be a valid HTTP or HTTPS URL",
            ));
        }

        Ok(())
    }
}
