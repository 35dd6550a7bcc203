use async_trait::async_trait;
use std::error::Error;

use crate::core::Frame;

/// Result type for device adapter operations
pub type DeviceResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Status of a device connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceStatus {
    Disconnected,
    Connected,
    Error,
}

/// Trait for live tracking-device adapters.
///
/// An adapter pulls frames off the device; the host forwards each one to
/// [`PlaybackEngine::push`](crate::playback::PlaybackEngine::push).
#[async_trait]
pub trait LiveDevice: Send {
    fn name(&self) -> &str;

    fn status(&self) -> DeviceStatus;

    async fn connect(&mut self) -> DeviceResult<()>;

    async fn disconnect(&mut self) -> DeviceResult<()>;

    /// Next frame from the device (non-blocking, `None` when nothing is queued)
    async fn receive(&mut self) -> DeviceResult<Option<Frame>>;
}
