//! # Frame Source
//!
//! Decodes the vehicle's video stream with an `ffmpeg` subprocess and
//! publishes the newest frame on a watch channel.
//!
//! `ffmpeg` writes raw RGB24 frames of exactly `width * height * 3` bytes to
//! stdout, so frames are split by length alone. If `ffmpeg` exits (stream not
//! up yet, vehicle rebooted) it is restarted after a short pause.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::VideoConfig;
use crate::error::{HudError, Result};

/// Latest decoded frame, `None` until the first one arrives
pub type FrameReceiver = watch::Receiver<Option<Arc<RgbImage>>>;

type FrameSender = watch::Sender<Option<Arc<RgbImage>>>;

/// Pause before restarting a decoder that exited
const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Background `ffmpeg` decoder.
pub struct FfmpegFrameSource {
    url: String,
    width: u32,
    height: u32,
    frames: Arc<FrameSender>,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl FfmpegFrameSource {
    pub fn new(config: &VideoConfig) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            url: config.source_url.clone(),
            width: config.width,
            height: config.height,
            frames: Arc::new(frames),
            running: None,
        }
    }

    pub fn subscribe(&self) -> FrameReceiver {
        self.frames.subscribe()
    }

    /// Spawn the decoding task. Does nothing if already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        info!("Decoding video from {}", self.url);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(decode_loop(
            ffmpeg_args(&self.url, self.width, self.height),
            self.width,
            self.height,
            Arc::clone(&self.frames),
            shutdown_rx,
        ));
        self.running = Some((shutdown, task));
    }

    /// Stop decoding; the `ffmpeg` process is killed before this returns.
    pub async fn stop(&mut self) {
        let Some((shutdown, task)) = self.running.take() else {
            return;
        };

        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            error!("Frame source task failed: {}", e);
        }
    }
}

/// Command line for decoding `url` to raw RGB24 at the output size.
pub fn ffmpeg_args(url: &str, width: u32, height: u32) -> Vec<String> {
    let size = format!("{}x{}", width, height);
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-fflags",
        "nobuffer",
        "-flags",
        "low_delay",
        "-i",
        url,
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        size.as_str(),
        "-",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

fn spawn_ffmpeg(args: &[String]) -> Result<Child> {
    Command::new("ffmpeg")
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| HudError::Video(format!("Failed to start ffmpeg: {}", e)))
}

async fn decode_loop(
    args: Vec<String>,
    width: u32,
    height: u32,
    frames: Arc<FrameSender>,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        match spawn_ffmpeg(&args) {
            Ok(mut child) => {
                let outcome = match child.stdout.take() {
                    Some(stdout) => tokio::select! {
                        biased;
                        _ = shutdown.changed() => None,
                        result = read_frames(stdout, width, height, &frames) => Some(result),
                    },
                    None => Some(Err(HudError::Video("ffmpeg stdout not captured".to_string()))),
                };

                if let Err(e) = child.kill().await {
                    debug!("ffmpeg already gone: {}", e);
                }

                match outcome {
                    None => break,
                    Some(Ok(count)) => info!("ffmpeg stream ended after {} frames", count),
                    Some(Err(e)) => warn!("Video decoding failed: {}", e),
                }
            }
            Err(e) => warn!("{}", e),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(RESTART_DELAY) => {}
        }
    }

    info!("Video decoding stopped");
}

/// Read whole raw RGB24 frames from `reader` until it ends, publishing each.
///
/// Returns the number of complete frames read. A trailing partial frame is
/// dropped.
pub async fn read_frames<R>(mut reader: R, width: u32, height: u32, frames: &FrameSender) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let frame_len = width as usize * height as usize * 3;
    let mut count = 0;

    loop {
        let mut buf = vec![0u8; frame_len];
        match reader.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(count),
            Err(e) => return Err(e.into()),
        }

        let image = RgbImage::from_raw(width, height, buf)
            .ok_or_else(|| HudError::Video("Frame buffer does not match frame size".to_string()))?;
        frames.send_replace(Some(Arc::new(image)));
        count += 1;
    }
}
