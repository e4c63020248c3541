//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration that flies a Tello on its stock access point with an Xbox
//! controller.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::normalize::{DEFAULT_NOISE_THRESHOLD, STICK_MAX_MAGNITUDE, TRIGGER_MAX_MAGNITUDE};
use crate::error::{HudError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Explicit `/dev/input/eventX` path. Empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: i32,

    #[serde(default = "default_stick_max")]
    pub stick_max: i32,

    #[serde(default = "default_trigger_max")]
    pub trigger_max: i32,

    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    #[serde(default = "default_vehicle_address")]
    pub address: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default = "default_motion_timeout_ms")]
    pub motion_timeout_ms: u64,
}

/// Command dispatch loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_toggle_debounce_ms")]
    pub toggle_debounce_ms: u64,

    /// Land automatically after the controller has been gone this long while
    /// airborne. 0 disables the automatic landing (hover only).
    #[serde(default = "default_failsafe_land_after_ms")]
    pub failsafe_land_after_ms: u64,
}

/// Telemetry sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_telemetry_timeout_ms")]
    pub timeout_ms: u64,
}

/// Video feed and display configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_video_enabled")]
    pub enabled: bool,

    #[serde(default = "default_source_url")]
    pub source_url: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Show frames in an `ffplay` window. When false frames are rendered
    /// and dropped.
    #[serde(default = "default_display")]
    pub display: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files. Empty disables file logging.
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_noise_threshold() -> i32 { DEFAULT_NOISE_THRESHOLD }
fn default_stick_max() -> i32 { STICK_MAX_MAGNITUDE }
fn default_trigger_max() -> i32 { TRIGGER_MAX_MAGNITUDE }
fn default_retry_interval_ms() -> u64 { 1000 }

fn default_vehicle_address() -> String { "192.168.10.1:8889".to_string() }
fn default_bind_address() -> String { "0.0.0.0:8889".to_string() }
fn default_command_timeout_ms() -> u64 { 7000 }
fn default_motion_timeout_ms() -> u64 { 20000 }

fn default_period_ms() -> u64 { 50 }
fn default_toggle_debounce_ms() -> u64 { 150 }
fn default_failsafe_land_after_ms() -> u64 { 5000 }

fn default_telemetry_interval_ms() -> u64 { 1000 }
fn default_telemetry_timeout_ms() -> u64 { 800 }

fn default_video_enabled() -> bool { true }
fn default_source_url() -> String { "udp://0.0.0.0:11111".to_string() }
fn default_width() -> u32 { 720 }
fn default_height() -> u32 { 480 }
fn default_refresh_ms() -> u64 { 5 }
fn default_display() -> bool { true }

fn default_log_level() -> String { "info".to_string() }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            noise_threshold: default_noise_threshold(),
            stick_max: default_stick_max(),
            trigger_max: default_trigger_max(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            address: default_vehicle_address(),
            bind_address: default_bind_address(),
            command_timeout_ms: default_command_timeout_ms(),
            motion_timeout_ms: default_motion_timeout_ms(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            toggle_debounce_ms: default_toggle_debounce_ms(),
            failsafe_land_after_ms: default_failsafe_land_after_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_telemetry_interval_ms(),
            timeout_ms: default_telemetry_timeout_ms(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: default_video_enabled(),
            source_url: default_source_url(),
            width: default_width(),
            height: default_height(),
            refresh_ms: default_refresh_ms(),
            display: default_display(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: String::new(),
        }
    }
}

impl DispatchConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn toggle_debounce(&self) -> Duration {
        Duration::from_millis(self.toggle_debounce_ms)
    }

    /// `None` when automatic landing is disabled.
    pub fn failsafe_land_after(&self) -> Option<Duration> {
        (self.failsafe_land_after_ms > 0).then(|| Duration::from_millis(self.failsafe_land_after_ms))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drone_hud::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.controller.noise_threshold < 0 || self.controller.noise_threshold > 50 {
            return Err(invalid("noise_threshold must be between 0 and 50"));
        }

        if self.controller.stick_max <= 0 || self.controller.trigger_max <= 0 {
            return Err(invalid("stick_max and trigger_max must be greater than 0"));
        }

        if self.controller.retry_interval_ms == 0 || self.controller.retry_interval_ms > 60000 {
            return Err(invalid("retry_interval_ms must be between 1 and 60000"));
        }

        if self.vehicle.address.is_empty() {
            return Err(invalid("vehicle address cannot be empty"));
        }

        if self.vehicle.bind_address.is_empty() {
            return Err(invalid("vehicle bind_address cannot be empty"));
        }

        for (name, value) in [
            ("command_timeout_ms", self.vehicle.command_timeout_ms),
            ("motion_timeout_ms", self.vehicle.motion_timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.dispatch.period_ms < 10 || self.dispatch.period_ms > 1000 {
            return Err(invalid("period_ms must be between 10 and 1000"));
        }

        if self.dispatch.toggle_debounce_ms > 2000 {
            return Err(invalid("toggle_debounce_ms must be at most 2000"));
        }

        if self.dispatch.failsafe_land_after_ms > 600000 {
            return Err(invalid("failsafe_land_after_ms must be at most 600000"));
        }

        if self.telemetry.interval_ms == 0 || self.telemetry.interval_ms > 60000 {
            return Err(invalid("telemetry interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.timeout_ms == 0 || self.telemetry.timeout_ms > self.telemetry.interval_ms {
            return Err(invalid("telemetry timeout_ms must be between 1 and interval_ms"));
        }

        if self.video.enabled && self.video.source_url.is_empty() {
            return Err(invalid("video source_url cannot be empty when enabled"));
        }

        if self.video.width < 64 || self.video.height < 64 {
            return Err(invalid("video width and height must be at least 64"));
        }

        if self.video.width > 3840 || self.video.height > 2160 {
            return Err(invalid("video width and height must be at most 3840x2160"));
        }

        if self.video.refresh_ms > 1000 {
            return Err(invalid("refresh_ms must be at most 1000"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> HudError {
    HudError::Config(toml::de::Error::custom(msg))
}
