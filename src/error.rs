//! Error types and handling for the `PlaceMap` core

use thiserror::Error;

use crate::models::LocationId;

/// Main error type for the `PlaceMap` core
#[derive(Error, Debug)]
pub enum PlaceMapError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Geocoding provider errors
    #[error("Geocoding error: {message}")]
    Geocoding { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Preference storage errors
    #[error("Preferences error: {message}")]
    Preferences { message: String },

    /// A location identifier was inserted twice. Identifiers are generated
    /// per location, so this means the uniqueness guarantee is broken.
    #[error("Duplicate location identifier: {id}")]
    DuplicateIdentifier { id: LocationId },

    /// The session task stopped or could not be reached
    #[error("Session error: {message}")]
    Session { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PlaceMapError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new geocoding error
    pub fn geocoding<S: Into<String>>(message: S) -> Self {
        Self::Geocoding {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new preferences error
    pub fn preferences<S: Into<String>>(message: S) -> Self {
        Self::Preferences {
            message: message.into(),
        }
    }

    /// Create a new session error
    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Whether this error signals a broken internal invariant rather than
    /// an expected runtime failure.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlaceMapError::DuplicateIdentifier { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlaceMapError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            PlaceMapError::Geocoding { .. } => {
                "Unable to reach the place search service. Please check your internet connection."
                    .to_string()
            }
            PlaceMapError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            PlaceMapError::Preferences { .. } => {
                "Saved preferences could not be read or written.".to_string()
            }
            PlaceMapError::DuplicateIdentifier { .. } => {
                "Internal error: location identifiers are no longer unique.".to_string()
            }
            PlaceMapError::Session { .. } => {
                "The map session is no longer running.".to_string()
            }
            PlaceMapError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
