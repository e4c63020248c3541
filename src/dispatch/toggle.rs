//! # Takeoff/Land Toggle
//!
//! The controller reports the Start button as a level (held or not). One
//! press must toggle the flight state exactly once, so the dispatcher feeds
//! each sampled level through a [`ToggleDetector`], which reports rising edges
//! and ignores further edges for a short lockout window. The window covers
//! contact bounce and a quick accidental double press; it is measured with
//! the caller's clock, so tests can drive it with any instant they like.

use std::time::Duration;
use tokio::time::Instant;

/// Whether the vehicle is believed to be flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    Grounded,
    Airborne,
}

/// What a toggle asks the vehicle to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightAction {
    Takeoff,
    Land,
}

impl FlightState {
    /// The action a toggle triggers from this state, and the state after it.
    #[must_use]
    pub fn toggle(self) -> (FlightAction, FlightState) {
        match self {
            FlightState::Grounded => (FlightAction::Takeoff, FlightState::Airborne),
            FlightState::Airborne => (FlightAction::Land, FlightState::Grounded),
        }
    }
}

/// Rising-edge detector with a lockout window.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tokio::time::Instant;
/// use drone_hud::dispatch::toggle::ToggleDetector;
///
/// let mut toggle = ToggleDetector::new(Duration::from_millis(150));
/// let t0 = Instant::now();
///
/// assert!(toggle.update(true, t0));                                // press
/// assert!(!toggle.update(true, t0 + Duration::from_millis(50)));  // still held
/// assert!(!toggle.update(false, t0 + Duration::from_millis(100)));
/// assert!(toggle.update(true, t0 + Duration::from_millis(300)));  // second press
/// ```
#[derive(Debug, Clone)]
pub struct ToggleDetector {
    previous: bool,
    lockout: Duration,
    locked_until: Option<Instant>,
}

impl ToggleDetector {
    #[must_use]
    pub fn new(lockout: Duration) -> Self {
        Self {
            previous: false,
            lockout,
            locked_until: None,
        }
    }

    /// Feed the current level; true exactly when it counts as a toggle.
    ///
    /// The level is always recorded, even inside the lockout window, so a
    /// press that is still held when the window closes is not reported.
    pub fn update(&mut self, level: bool, now: Instant) -> bool {
        let rising = level && !self.previous;
        self.previous = level;

        if !rising {
            return false;
        }

        if let Some(until) = self.locked_until {
            if now < until {
                return false;
            }
        }

        self.locked_until = Some(now + self.lockout);
        true
    }

    /// Forget the previous level, e.g. after the controller reconnects.
    ///
    /// The level is assumed held so a button that is down at reconnect does
    /// not toggle.
    pub fn reset_level(&mut self) {
        self.previous = true;
    }
}
