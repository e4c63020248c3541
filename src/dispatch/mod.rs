//! # Dispatch Module
//!
//! Turns controller snapshots into a steady stream of vehicle commands.
//!
//! This module handles:
//! - Velocity command type and stick mapping ([`command`])
//! - Takeoff/land toggle detection ([`toggle`])
//! - The periodic control loop ([`dispatcher`])

pub mod command;
pub mod dispatcher;
pub mod toggle;

pub use command::VelocityCommand;
pub use dispatcher::CommandDispatcher;
pub use toggle::FlightState;
