//! # Error Types
//!
//! Custom error types for Drone HUD using `thiserror`.

use thiserror::Error;

/// Main error type for Drone HUD
#[derive(Debug, Error)]
pub enum HudError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input device errors (read failure, disconnect)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No supported game controller found
    #[error("No supported game controller found")]
    ControllerNotFound,

    /// Vehicle rejected a command or the link failed
    #[error("Vehicle error: {0}")]
    Vehicle(String),

    /// Vehicle did not answer in time
    #[error("Vehicle did not respond to '{0}' in time")]
    VehicleTimeout(String),

    /// Video source or display errors
    #[error("Video error: {0}")]
    Video(String),
}

/// Result type alias for Drone HUD
pub type Result<T> = std::result::Result<T, HudError>;
