//! # Telemetry Sampler
//!
//! Polls the vehicle battery on its own slow cadence, independent of the
//! command loop, and publishes the result as a [`TelemetrySnapshot`].
//!
//! A read that fails or exceeds the timeout is logged and skipped. The
//! snapshot keeps the last good value, so the overlay shows something
//! slightly old rather than nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::TelemetrySnapshot;
use crate::config::TelemetryConfig;
use crate::error::{HudError, Result};
use crate::vehicle::Vehicle;

/// Owns the battery sampling task.
pub struct TelemetrySampler {
    vehicle: Arc<dyn Vehicle>,
    state: Arc<watch::Sender<TelemetrySnapshot>>,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
    interval: Duration,
    timeout: Duration,
}

impl TelemetrySampler {
    pub fn new(vehicle: Arc<dyn Vehicle>, config: &TelemetryConfig) -> Self {
        let (state, _) = watch::channel(TelemetrySnapshot::default());
        Self {
            vehicle,
            state: Arc::new(state),
            running: None,
            interval: Duration::from_millis(config.interval_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Spawn the sampling task. Does nothing if already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(sample_loop(
            Arc::clone(&self.vehicle),
            Arc::clone(&self.state),
            shutdown_rx,
            self.interval,
            self.timeout,
        ));
        self.running = Some((shutdown, task));
    }

    /// Stop sampling and wait for the task to exit.
    pub async fn stop(&mut self) {
        let Some((shutdown, task)) = self.running.take() else {
            return;
        };

        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            error!("Telemetry task failed: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Latest snapshot. Never blocks.
    pub fn read(&self) -> TelemetrySnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.state.subscribe()
    }
}

async fn sample_loop(
    vehicle: Arc<dyn Vehicle>,
    state: Arc<watch::Sender<TelemetrySnapshot>>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
    timeout: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Telemetry sampling every {:?}", period);

    let mut failures: u64 = 0;

    while !*shutdown.borrow() {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let reading = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            reading = read_with_timeout(vehicle.as_ref(), timeout) => reading,
        };

        match reading {
            Ok(battery) => {
                if failures > 0 {
                    info!("Battery readable again after {} failures", failures);
                    failures = 0;
                }
                state.send_modify(|snapshot| *snapshot = snapshot.next(battery, Instant::now()));
                debug!("Battery {}%", battery);
            }
            Err(e) => {
                failures += 1;
                let age = state.borrow().age(Instant::now());
                match age {
                    Some(age) => warn!(
                        "Battery read failed ({} in a row), keeping value from {:?} ago: {}",
                        failures, age, e
                    ),
                    None => warn!("Battery read failed ({} in a row), no reading yet: {}", failures, e),
                }
            }
        }
    }

    info!("Telemetry sampling stopped");
}

async fn read_with_timeout(vehicle: &dyn Vehicle, timeout: Duration) -> Result<u8> {
    tokio::time::timeout(timeout, vehicle.read_battery())
        .await
        .map_err(|_| HudError::VehicleTimeout("battery?".to_string()))?
}
