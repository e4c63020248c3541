//! # Vehicle Module
//!
//! The vehicle as the control core sees it: a sink for velocity commands,
//! takeoff/land requests and a battery reading.
//!
//! This module handles:
//! - The [`Vehicle`] trait used by the dispatcher and the telemetry sampler
//! - The Tello SDK link over UDP ([`tello`])

pub mod tello;

use async_trait::async_trait;

use crate::dispatch::command::VelocityCommand;
use crate::error::Result;

/// Operations the control core needs from a vehicle.
///
/// Implementations are shared between tasks behind an `Arc`, so every method
/// takes `&self`.
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Send one velocity command. Never waits for an acknowledgement.
    async fn send_velocity(&self, command: VelocityCommand) -> Result<()>;

    /// Take off. May fail if the vehicle is already flying or cannot fly.
    async fn takeoff(&self) -> Result<()>;

    /// Land. May fail if the vehicle is not flying.
    async fn land(&self) -> Result<()>;

    /// Battery charge in percent, 0 to 100.
    async fn read_battery(&self) -> Result<u8>;
}
