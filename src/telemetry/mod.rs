//! # Telemetry Module
//!
//! Periodic sampling of vehicle telemetry for the video overlay.
//!
//! This module handles:
//! - The [`TelemetrySnapshot`] shared with the renderer
//! - The background battery sampler ([`sampler`])

pub mod sampler;

pub use sampler::TelemetrySampler;

use tokio::time::Instant;

/// Latest telemetry values.
///
/// Starts with an unknown battery and is replaced as a whole after every
/// successful sample; failed samples leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    /// Battery charge in percent, `None` until the first successful read
    pub battery: Option<u8>,
    /// Number of successful samples so far
    pub sequence: u64,
    pub sampled_at: Option<Instant>,
}

impl TelemetrySnapshot {
    /// Snapshot following `self` with a new battery reading.
    #[must_use]
    pub fn next(&self, battery: u8, now: Instant) -> Self {
        Self {
            battery: Some(battery.min(100)),
            sequence: self.sequence.wrapping_add(1),
            sampled_at: Some(now),
        }
    }

    /// Time since the last successful sample, if there was one.
    pub fn age(&self, now: Instant) -> Option<std::time::Duration> {
        self.sampled_at.map(|at| now.saturating_duration_since(at))
    }
}
