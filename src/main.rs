//! # Drone HUD
//!
//! Fly a Tello-class drone with an Xbox controller while its video stream is
//! shown with a battery gauge overlay.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (path from the first argument, defaults otherwise)
//!    - Set up logging
//!    - Connect to the vehicle and open the controller
//!
//! 2. **Running**
//!    - Controller polling, telemetry sampling, command dispatch (20 Hz by
//!      default) and the video pipeline run as independent tasks
//!    - The Start button toggles takeoff and landing
//!
//! 3. **Graceful Shutdown** (Ctrl+C)
//!    - Stop every task and wait for it to finish
//!    - Land the vehicle if it is still flying
//!    - Turn the video stream off
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use drone_hud::config::{Config, VideoConfig};
use drone_hud::controller::{InputPoller, XboxController};
use drone_hud::dispatch::{CommandDispatcher, FlightState};
use drone_hud::logging;
use drone_hud::overlay::OverlayRenderer;
use drone_hud::telemetry::{TelemetrySampler, TelemetrySnapshot};
use drone_hud::vehicle::tello::TelloLink;
use drone_hud::vehicle::Vehicle;
use drone_hud::video::pipeline::PipelineStats;
use drone_hud::video::{FfmpegFrameSource, FfplaySink, FrameSink, NullSink, VideoPipeline};

/// Window title of the video display
const WINDOW_TITLE: &str = "Drone HUD";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let missing_config = config_path
        .as_deref()
        .filter(|path| !Path::new(path).exists())
        .map(str::to_string);

    let config = match config_path.as_deref() {
        Some(path) if missing_config.is_none() => {
            Config::load(path).with_context(|| format!("Failed to load configuration from {}", path))?
        }
        _ => Config::default(),
    };

    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;
    info!("Drone HUD v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = missing_config {
        warn!("Configuration file {} not found, using defaults", path);
    }

    let link = Arc::new(
        TelloLink::connect(&config.vehicle)
            .await
            .context("Failed to connect to vehicle")?,
    );
    let vehicle: Arc<dyn Vehicle> = link.clone();

    let controller = XboxController::open(&config.controller.device_path).context("Failed to open controller")?;
    info!("Controller opened at {}", controller.device_path().display());

    let mut poller = InputPoller::new(controller, &config.controller);
    poller.start();

    let mut sampler = TelemetrySampler::new(Arc::clone(&vehicle), &config.telemetry);
    sampler.start();

    let (shutdown, shutdown_rx) = watch::channel(false);
    let dispatcher = CommandDispatcher::new(Arc::clone(&vehicle), poller.subscribe(), &config.dispatch);
    let dispatch_task = tokio::spawn(dispatcher.run(shutdown_rx.clone()));

    let video = start_video(&config.video, sampler.subscribe(), shutdown_rx);

    info!("Press Start to take off or land, Ctrl+C to exit");
    wait_for_shutdown(tokio::signal::ctrl_c(), &shutdown).await;

    // An unknown state is treated as flying so the vehicle still gets landed
    let flight_state = match dispatch_task.await {
        Ok(state) => state,
        Err(e) => {
            error!("Dispatcher task failed: {}", e);
            FlightState::Airborne
        }
    };

    if let Some((mut source, task)) = video {
        match task.await {
            Ok(stats) => info!("Presented {} frames", stats.presented),
            Err(e) => error!("Video task failed: {}", e),
        }
        source.stop().await;
    }
    sampler.stop().await;
    poller.stop().await;

    if flight_state == FlightState::Airborne {
        info!("Vehicle still airborne, landing");
        if let Err(e) = vehicle.land().await {
            warn!("Landing at shutdown failed: {}", e);
        }
    }

    if let Err(e) = link.close().await {
        warn!("Failed to close vehicle link: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for `signal`, then tell every task to stop.
///
/// A failed signal listener still leads into the ordered shutdown.
async fn wait_for_shutdown<F>(signal: F, shutdown: &watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => error!("Failed to listen for Ctrl+C, shutting down: {}", e),
    }
    shutdown.send_replace(true);
}

/// Start decoding and displaying video, if enabled.
fn start_video(
    config: &VideoConfig,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    shutdown: watch::Receiver<bool>,
) -> Option<(FfmpegFrameSource, JoinHandle<PipelineStats>)> {
    if !config.enabled {
        info!("Video disabled");
        return None;
    }

    let renderer = OverlayRenderer::from_config(config);
    let (width, height) = renderer.output_size();

    let sink: Box<dyn FrameSink> = if config.display {
        match FfplaySink::spawn(width, height, WINDOW_TITLE) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                warn!("{}; continuing without display", e);
                Box::new(NullSink::new())
            }
        }
    } else {
        Box::new(NullSink::new())
    };

    let mut source = FfmpegFrameSource::new(config);
    let pipeline = VideoPipeline::new(
        renderer,
        source.subscribe(),
        telemetry,
        sink,
        Duration::from_millis(config.refresh_ms),
    );
    source.start();

    Some((source, tokio::spawn(pipeline.run(shutdown))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_error_still_shuts_down() {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let failing = async { Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler")) };

        wait_for_shutdown(failing, &shutdown).await;
        assert!(*shutdown_rx.borrow());
    }

    #[tokio::test]
    async fn test_signal_shuts_down() {
        let (shutdown, shutdown_rx) = watch::channel(false);
        wait_for_shutdown(async { Ok::<(), std::io::Error>(()) }, &shutdown).await;
        assert!(*shutdown_rx.borrow());
    }
}
