//! # Input Poller
//!
//! Background task that owns the input device, folds every batch into a
//! [`ControllerState`] and publishes a copy after each one.
//!
//! The state lives in a `tokio::sync::watch` channel with this task as its
//! only writer. Readers take a copy with [`InputPoller::read`] or hold a
//! receiver from [`InputPoller::subscribe`]; neither ever blocks the writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::device::InputDevice;
use super::mapper::{AxisScale, ControllerState, EventMapper};
use crate::config::ControllerConfig;

struct Running<D> {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<(D, EventMapper)>,
}

/// Owns an [`InputDevice`] and the polling task reading it.
pub struct InputPoller<D: InputDevice + 'static> {
    /// Device and mapper while stopped; moved into the task while running.
    idle: Option<(D, EventMapper)>,
    running: Option<Running<D>>,
    state: Arc<watch::Sender<ControllerState>>,
    retry_interval: Duration,
}

impl<D: InputDevice + 'static> InputPoller<D> {
    pub fn new(device: D, config: &ControllerConfig) -> Self {
        let scale = AxisScale {
            stick_max: config.stick_max,
            trigger_max: config.trigger_max,
            noise_threshold: config.noise_threshold,
        };
        let (state, _) = watch::channel(ControllerState::default());

        Self {
            idle: Some((device, EventMapper::new(scale))),
            running: None,
            state: Arc::new(state),
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        }
    }

    /// Spawn the polling task. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let Some((device, mapper)) = self.idle.take() else {
            warn!("Input device was lost; polling cannot restart");
            return;
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            device,
            mapper,
            Arc::clone(&self.state),
            shutdown_rx,
            self.retry_interval,
        ));
        self.running = Some(Running { shutdown, task });
    }

    /// Ask the task to exit and wait until it has, so the device is no longer
    /// in use when this returns. Does nothing if not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        match running.task.await {
            Ok(parts) => self.idle = Some(parts),
            Err(e) => error!("Input polling task failed: {}", e),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Latest controller state.
    pub fn read(&self) -> ControllerState {
        *self.state.borrow()
    }

    /// Receiver for consumers that run on their own cadence.
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }
}

async fn poll_loop<D: InputDevice>(
    mut device: D,
    mut mapper: EventMapper,
    state: Arc<watch::Sender<ControllerState>>,
    mut shutdown: watch::Receiver<bool>,
    retry_interval: Duration,
) -> (D, EventMapper) {
    info!("Input polling started on {}", device.describe());
    let mut failures: u64 = 0;

    while !*shutdown.borrow() {
        tokio::select! {
            _ = shutdown.changed() => break,
            result = device.read_batch() => match result {
                Ok(batch) => {
                    if failures > 0 {
                        info!("Controller back after {} failed reads", failures);
                        failures = 0;
                    }
                    mapper.apply_batch(&batch);
                    state.send_replace(*mapper.state());
                }
                Err(e) => {
                    failures += 1;
                    if failures == 1 {
                        warn!("Controller read failed, holding last known state: {}", e);
                    } else {
                        debug!("Controller read failed ({} in a row): {}", failures, e);
                    }
                    mapper.mark_disconnected();
                    state.send_replace(*mapper.state());

                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(retry_interval) => {}
                    }
                }
            }
        }
    }

    info!("Input polling stopped");
    (device, mapper)
}
