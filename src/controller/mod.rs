//! # Controller Module
//!
//! Game controller input handling.
//!
//! This module handles:
//! - Xbox controller detection and event reading via evdev ([`device`])
//! - Scaling raw axis values and filtering stick noise ([`normalize`])
//! - Folding input events into a [`ControllerState`] ([`mapper`])
//! - The background polling task ([`poller`])

pub mod device;
pub mod mapper;
pub mod normalize;
pub mod poller;

pub use device::{InputDevice, XboxController};
pub use mapper::ControllerState;
pub use poller::InputPoller;
