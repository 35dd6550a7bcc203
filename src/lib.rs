//! Capture, packing and deterministic playback of motion-tracking frames.
//!
//! Live frames from a tracking device are pushed into a [`PlaybackEngine`],
//! which can capture them into a fixed-size ring, turn the capture into a
//! croppable [`Recording`], and replay it to a sink with the original
//! inter-frame timing. Recordings round-trip through a schema-packed JSON
//! format, optionally gzip-compressed.

pub mod codec;
pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod input;
pub mod playback;
pub mod recording;

pub use crate::config::EngineConfig;
pub use crate::core::{EngineEvents, Frame, FrameBuffer};
pub use crate::error::{Result, SpyError};
pub use crate::playback::{PlaybackEngine, PlaybackOptions, PlayerState};
pub use crate::recording::{ExportFormat, Recording, RecordingOptions};
