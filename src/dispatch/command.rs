//! # Velocity Command Mapper
//!
//! Maps the controller sticks onto the vehicle's four velocity axes.
//!
//! ## Axis Assignments
//!
//! | Axis | Input |
//! |------|-------|
//! | Lateral | Right Stick X |
//! | Forward/back | Right Stick Y |
//! | Vertical | Left Stick Y |
//! | Yaw | Left Stick X |
//!
//! Every axis is an integer in `[-100, 100]`. [`VelocityCommand::new`] clamps,
//! so an out-of-range command cannot be built.

use crate::controller::mapper::ControllerState;
use crate::controller::normalize::{NORMALIZED_MAX, NORMALIZED_MIN};

/// Four-axis velocity command.
///
/// # Examples
///
/// ```
/// use drone_hud::dispatch::command::VelocityCommand;
///
/// let command = VelocityCommand::new(150, -20, 0, 0);
/// assert_eq!(command.lateral(), 100);
/// assert!(!command.is_hover());
/// assert!(VelocityCommand::HOVER.is_hover());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VelocityCommand {
    lateral: i8,
    forward_back: i8,
    vertical: i8,
    yaw: i8,
}

impl VelocityCommand {
    /// Hold position. Always safe to send in place of anything else.
    pub const HOVER: VelocityCommand = VelocityCommand {
        lateral: 0,
        forward_back: 0,
        vertical: 0,
        yaw: 0,
    };

    #[must_use]
    pub fn new(lateral: i32, forward_back: i32, vertical: i32, yaw: i32) -> Self {
        Self {
            lateral: clamp_axis(lateral),
            forward_back: clamp_axis(forward_back),
            vertical: clamp_axis(vertical),
            yaw: clamp_axis(yaw),
        }
    }

    pub fn lateral(&self) -> i8 {
        self.lateral
    }

    pub fn forward_back(&self) -> i8 {
        self.forward_back
    }

    pub fn vertical(&self) -> i8 {
        self.vertical
    }

    pub fn yaw(&self) -> i8 {
        self.yaw
    }

    /// All four axes as an array, in wire order.
    pub fn axes(&self) -> [i8; 4] {
        [self.lateral, self.forward_back, self.vertical, self.yaw]
    }

    pub fn is_hover(&self) -> bool {
        *self == Self::HOVER
    }
}

#[inline]
fn clamp_axis(value: i32) -> i8 {
    value.clamp(NORMALIZED_MIN, NORMALIZED_MAX) as i8
}

/// Maps controller sticks to a velocity command.
///
/// # Examples
///
/// ```
/// use drone_hud::controller::mapper::ControllerState;
/// use drone_hud::dispatch::command::map_controller;
///
/// let mut state = ControllerState::default();
/// state.right_stick_x = 50;
/// state.left_stick_y = -30;
///
/// let command = map_controller(&state);
/// assert_eq!(command.lateral(), 50);
/// assert_eq!(command.vertical(), -30);
/// ```
#[must_use]
pub fn map_controller(state: &ControllerState) -> VelocityCommand {
    VelocityCommand::new(
        state.right_stick_x,
        state.right_stick_y,
        state.left_stick_y,
        state.left_stick_x,
    )
}
