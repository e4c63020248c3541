//! # Video Pipeline
//!
//! Waits for each new decoded frame, composites the current telemetry onto
//! it and presents the result. Frames that arrive while one is being drawn
//! are skipped, so the display always shows the newest one.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::sink::FrameSink;
use super::source::FrameReceiver;
use crate::overlay::OverlayRenderer;
use crate::telemetry::TelemetrySnapshot;

/// Frame counters reported when the pipeline stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub presented: u64,
    pub failed: u64,
}

pub struct VideoPipeline<S: FrameSink> {
    renderer: OverlayRenderer,
    frames: FrameReceiver,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    sink: S,
    refresh: Duration,
}

impl<S: FrameSink> VideoPipeline<S> {
    pub fn new(
        renderer: OverlayRenderer,
        frames: FrameReceiver,
        telemetry: watch::Receiver<TelemetrySnapshot>,
        sink: S,
        refresh: Duration,
    ) -> Self {
        Self {
            renderer,
            frames,
            telemetry,
            sink,
            refresh,
        }
    }

    /// Present frames until `shutdown` turns true or the source goes away,
    /// then close the sink.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PipelineStats {
        let mut stats = PipelineStats::default();
        let mut consecutive_failures: u64 = 0;
        info!("Video pipeline started");

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                changed = self.frames.changed() => {
                    if changed.is_err() {
                        info!("Frame source closed");
                        break;
                    }
                }
            }

            let latest = self.frames.borrow_and_update().clone();
            let Some(frame) = latest else {
                continue;
            };
            let snapshot = *self.telemetry.borrow();
            let output = self.renderer.render(&frame, &snapshot);

            match self.sink.present(&output).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    stats.presented += 1;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    stats.failed += 1;
                    if consecutive_failures == 1 {
                        warn!("Failed to present frame: {}", e);
                    } else {
                        debug!("Failed to present frame ({} in a row): {}", consecutive_failures, e);
                    }
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.refresh) => {}
            }
        }

        if let Err(e) = self.sink.close().await {
            warn!("Failed to close display: {}", e);
        }
        info!(
            "Video pipeline stopped ({} frames presented, {} failed)",
            stats.presented, stats.failed
        );
        stats
    }
}
