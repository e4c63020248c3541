//! # Video Module
//!
//! Frame delivery around the overlay renderer.
//!
//! This module handles:
//! - Decoding the vehicle stream with `ffmpeg` ([`source`])
//! - Displaying composited frames ([`sink`])
//! - The render loop between them ([`pipeline`])

pub mod pipeline;
pub mod sink;
pub mod source;

pub use pipeline::VideoPipeline;
pub use sink::{FfplaySink, FrameSink, NullSink};
pub use source::{FfmpegFrameSource, FrameReceiver};
