//! # Frame Sinks
//!
//! Where composited frames go: an `ffplay` window, or nowhere.

use async_trait::async_trait;
use image::RgbImage;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info};

use crate::error::{HudError, Result};

/// Consumer of rendered frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Hand one frame to the display.
    async fn present(&mut self, frame: &RgbImage) -> Result<()>;

    /// Release the display. Called once when the pipeline stops.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Displays frames by piping raw RGB24 into `ffplay`.
pub struct FfplaySink {
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
}

impl FfplaySink {
    /// Start `ffplay` reading `width` x `height` raw frames from stdin.
    ///
    /// # Errors
    ///
    /// Returns error if `ffplay` cannot be started.
    pub fn spawn(width: u32, height: u32, title: &str) -> Result<Self> {
        let mut child = Command::new("ffplay")
            .args(ffplay_args(width, height, title))
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HudError::Video(format!("Failed to start ffplay: {}", e)))?;

        let stdin = child.stdin.take();
        info!("Displaying {}x{} video in ffplay", width, height);
        Ok(Self {
            child,
            stdin,
            width,
            height,
        })
    }
}

/// Command line for showing raw RGB24 frames from stdin.
pub fn ffplay_args(width: u32, height: u32, title: &str) -> Vec<String> {
    let size = format!("{}x{}", width, height);
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-fflags",
        "nobuffer",
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgb24",
        "-video_size",
        size.as_str(),
        "-window_title",
        title,
        "-i",
        "-",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

#[async_trait]
impl FrameSink for FfplaySink {
    async fn present(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(HudError::Video(format!(
                "Frame is {}x{}, display expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| HudError::Video("Display already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| HudError::Video(format!("Display closed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        // Closing stdin lets ffplay finish on its own; kill covers the window
        // staying open.
        self.stdin.take();
        if let Err(e) = self.child.kill().await {
            debug!("ffplay already exited: {}", e);
        }
        Ok(())
    }
}

/// Discards every frame. Used when no display is wanted.
#[derive(Debug, Default)]
pub struct NullSink {
    presented: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

#[async_trait]
impl FrameSink for NullSink {
    async fn present(&mut self, _frame: &RgbImage) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

/// Boxed sinks are sinks, so the binary can choose one at runtime.
#[async_trait]
impl FrameSink for Box<dyn FrameSink> {
    async fn present(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).present(frame).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}
