//! # Drone HUD Library
//!
//! Fly a Tello-class drone with an Xbox controller and watch its video with a
//! live battery gauge drawn on top.
//!
//! Three activities run side by side without waiting on each other:
//! controller polling, the periodic command loop, and telemetry sampling with
//! overlay compositing. They share state only through `tokio::sync::watch`
//! snapshots.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod telemetry;
pub mod vehicle;
pub mod video;
