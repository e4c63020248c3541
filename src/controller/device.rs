//! # Xbox Controller Device Module
//!
//! Detects an Xbox-style game controller through the Linux evdev interface and
//! turns its event stream into batches of [`RawInputSample`]s.
//!
//! ## Controller Detection
//!
//! The first `/dev/input/event*` device with the Microsoft vendor ID (0x045e)
//! wins; failing that, any device exposing both `BTN_SOUTH` and `BTN_START`
//! is accepted as a generic gamepad. An explicit `device_path` skips the scan.
//!
//! ## Event Codes
//!
//! | evdev Code | Channel |
//! |------------|---------|
//! | ABS_X / ABS_Y | Left stick |
//! | ABS_RX / ABS_RY | Right stick |
//! | ABS_Z / ABS_RZ | Left / right trigger |
//! | ABS_HAT0X / ABS_HAT0Y | D-Pad |
//! | BTN_SOUTH / EAST / WEST / NORTH | A / B / X / Y |
//! | BTN_TL / BTN_TR | Bumpers |
//! | BTN_THUMBL / BTN_THUMBR | Stick clicks |
//! | BTN_SELECT / BTN_START | Back / Start |
//!
//! evdev reports stick Y axes as negative when pushed up; they are negated
//! here so every channel is positive up/right.

use async_trait::async_trait;
use evdev::{AbsoluteAxisType, Device, EventStream, InputEvent, InputEventKind, Key, Synchronization};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::mapper::{Channel, RawInputSample};
use crate::error::{HudError, Result};

/// Microsoft vendor ID
const MICROSOFT_VENDOR_ID: u16 = 0x045e;

/// Source of controller input batches.
///
/// `read_batch` waits for the next batch of events. Dropping the returned
/// future before it completes must be safe, so shutdown can cancel a read
/// that is still waiting on hardware.
#[async_trait]
pub trait InputDevice: Send {
    /// Wait for the next batch of samples.
    async fn read_batch(&mut self) -> Result<Vec<RawInputSample>>;

    /// Human readable description for logs.
    fn describe(&self) -> String;
}

/// Xbox controller handle backed by an evdev event stream.
pub struct XboxController {
    path: PathBuf,
    name: String,
    stream: Option<EventStream>,
}

impl std::fmt::Debug for XboxController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XboxController")
            .field("path", &self.path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl XboxController {
    /// Open a controller, either at `device_path` or the first one found.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no matching device under `/dev/input`
    /// - `Controller`: the device exists but cannot be opened or streamed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drone_hud::controller::device::XboxController;
    ///
    /// # #[tokio::main] async fn main() -> drone_hud::error::Result<()> {
    /// let controller = XboxController::open("")?;
    /// println!("Connected to controller at: {}", controller.device_path().display());
    /// # Ok(()) }
    /// ```
    pub fn open(device_path: &str) -> Result<Self> {
        let path = if device_path.is_empty() {
            Self::detect()?
        } else {
            PathBuf::from(device_path)
        };

        let device = Device::open(&path)
            .map_err(|e| HudError::Controller(format!("Failed to open {}: {}", path.display(), e)))?;
        let name = device.name().unwrap_or("unknown controller").to_string();
        let stream = device
            .into_event_stream()
            .map_err(|e| HudError::Controller(format!("Failed to stream {}: {}", path.display(), e)))?;

        info!("Using controller '{}' at {}", name, path.display());

        Ok(Self {
            path,
            name,
            stream: Some(stream),
        })
    }

    /// Scan `/dev/input` for a supported controller.
    fn detect() -> Result<PathBuf> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(HudError::Controller("/dev/input directory not found".to_string()));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| HudError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HudError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic choice when several controllers are plugged in
        entries.sort_by_key(|entry| entry.path());

        let mut fallback = None;

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );

                    if id.vendor() == MICROSOFT_VENDOR_ID {
                        return Ok(path);
                    }

                    let is_gamepad = device
                        .supported_keys()
                        .map(|keys| keys.contains(Key::BTN_SOUTH) && keys.contains(Key::BTN_START))
                        .unwrap_or(false);
                    if is_gamepad && fallback.is_none() {
                        fallback = Some(path);
                    }
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        fallback.ok_or(HudError::ControllerNotFound)
    }

    /// Get the device path of this controller
    pub fn device_path(&self) -> &Path {
        &self.path
    }

    fn reopen(&mut self) -> Result<()> {
        let device = Device::open(&self.path)
            .map_err(|e| HudError::Controller(format!("Failed to reopen {}: {}", self.path.display(), e)))?;
        let stream = device
            .into_event_stream()
            .map_err(|e| HudError::Controller(format!("Failed to stream {}: {}", self.path.display(), e)))?;
        info!("Controller at {} reopened", self.path.display());
        self.stream = Some(stream);
        Ok(())
    }
}

#[async_trait]
impl InputDevice for XboxController {
    async fn read_batch(&mut self) -> Result<Vec<RawInputSample>> {
        if self.stream.is_none() {
            self.reopen()?;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(HudError::Controller("controller stream unavailable".to_string()));
        };

        let mut batch = Vec::new();
        loop {
            let event = match stream.next_event().await {
                Ok(event) => event,
                Err(e) => {
                    // Stream is unusable after an error (usually ENODEV); reopen on next read
                    self.stream = None;
                    return Err(HudError::Controller(format!("Failed to fetch events: {}", e)));
                }
            };

            if matches!(event.kind(), InputEventKind::Synchronization(Synchronization::SYN_REPORT)) {
                if !batch.is_empty() {
                    return Ok(batch);
                }
                continue;
            }

            if let Some(sample) = translate_event(&event) {
                batch.push(sample);
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.path.display())
    }
}

/// Translate one evdev event into a logical sample.
///
/// Returns `None` for events the controller state does not track (sync,
/// force feedback, misc and unknown codes).
pub fn translate_event(event: &InputEvent) -> Option<RawInputSample> {
    let value = event.value();
    let (channel, value) = match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_X => (Channel::LeftStickX, value),
            AbsoluteAxisType::ABS_Y => (Channel::LeftStickY, value.saturating_neg()),
            AbsoluteAxisType::ABS_RX => (Channel::RightStickX, value),
            AbsoluteAxisType::ABS_RY => (Channel::RightStickY, value.saturating_neg()),
            AbsoluteAxisType::ABS_Z => (Channel::LeftTrigger, value),
            AbsoluteAxisType::ABS_RZ => (Channel::RightTrigger, value),
            AbsoluteAxisType::ABS_HAT0X => (Channel::DpadX, value),
            AbsoluteAxisType::ABS_HAT0Y => (Channel::DpadY, value),
            _ => return None,
        },
        InputEventKind::Key(key) => {
            let channel = match key {
                Key::BTN_SOUTH => Channel::A,
                Key::BTN_EAST => Channel::B,
                Key::BTN_WEST => Channel::X,
                Key::BTN_NORTH => Channel::Y,
                Key::BTN_TL => Channel::LeftBumper,
                Key::BTN_TR => Channel::RightBumper,
                Key::BTN_THUMBL => Channel::LeftThumb,
                Key::BTN_THUMBR => Channel::RightThumb,
                Key::BTN_SELECT => Channel::Back,
                Key::BTN_START => Channel::Start,
                _ => return None,
            };
            (channel, value)
        }
        _ => return None,
    };

    Some(RawInputSample::new(channel, value))
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use tokio::sync::mpsc;

    /// Input device fed from a channel. Once the sender is dropped the device
    /// blocks forever, like a controller nobody touches.
    pub struct ScriptedDevice {
        batches: mpsc::UnboundedReceiver<Result<Vec<RawInputSample>>>,
    }

    impl ScriptedDevice {
        pub fn new() -> (Self, mpsc::UnboundedSender<Result<Vec<RawInputSample>>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { batches: rx }, tx)
        }
    }

    #[async_trait]
    impl InputDevice for ScriptedDevice {
        async fn read_batch(&mut self) -> Result<Vec<RawInputSample>> {
            match self.batches.recv().await {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }

        fn describe(&self) -> String {
            "scripted device".to_string()
        }
    }
}
