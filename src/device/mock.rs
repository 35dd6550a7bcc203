use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;

use crate::core::Frame;
use crate::device::live_device::{DeviceResult, DeviceStatus, LiveDevice};

/// Microseconds between synthesized frames (~110 fps)
const FRAME_INTERVAL_US: i64 = 9_000;

/// Mock tracking device for testing without hardware
///
/// Frames are either injected by the caller or synthesized: one hand
/// sweeping along the x axis with a single pointable at its tip.
pub struct MockDevice {
    name: String,
    status: DeviceStatus,
    rx_buffer: VecDeque<Frame>,
    frame_counter: i64,
    auto_generate: bool,
    fail_next: bool,
}

impl MockDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DeviceStatus::Disconnected,
            rx_buffer: VecDeque::new(),
            frame_counter: 0,
            auto_generate: false,
            fail_next: false,
        }
    }

    /// Enable automatic frame generation
    pub fn set_auto_generate(&mut self, enabled: bool) {
        self.auto_generate = enabled;
    }

    /// Add a frame to the receive buffer (for testing)
    pub fn inject_frame(&mut self, frame: Frame) {
        self.rx_buffer.push_back(frame);
    }

    pub fn inject_frames(&mut self, frames: Vec<Frame>) {
        self.rx_buffer.extend(frames);
    }

    /// Make the next receive fail and put the device in the error state
    /// until it is reconnected
    pub fn fail_next_receive(&mut self) {
        self.fail_next = true;
    }

    pub fn rx_buffer_size(&self) -> usize {
        self.rx_buffer.len()
    }

    fn generate_frame(&mut self) -> Frame {
        self.frame_counter += 1;
        let n = self.frame_counter;
        let x = ((n % 200) - 100) as f64;
        let palm = json!([x, 180.0, 20.0]);

        Frame::new(n, n * FRAME_INTERVAL_US)
            .with(
                "hands",
                json!([{
                    "id": 1,
                    "type": "right",
                    "palmPosition": palm,
                    "palmNormal": [0.0, -1.0, 0.0],
                    "direction": [0.0, 0.0, -1.0],
                    "palmVelocity": [100.0, 0.0, 0.0],
                    "grabStrength": 0.0,
                    "pinchStrength": 0.0,
                    "confidence": 1.0
                }]),
            )
            .with(
                "pointables",
                json!([{
                    "id": 10,
                    "handId": 1,
                    "type": 1,
                    "tool": false,
                    "length": 55.0,
                    "direction": [0.0, 0.0, -1.0],
                    "tipPosition": [x, 180.0, -40.0]
                }]),
            )
            .with(
                "interactionBox",
                json!({"center": [0.0, 200.0, 0.0], "size": [235.0, 235.0, 147.0]}),
            )
    }
}

#[async_trait]
impl LiveDevice for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> DeviceStatus {
        self.status
    }

    async fn connect(&mut self) -> DeviceResult<()> {
        self.status = DeviceStatus::Connected;
        self.frame_counter = 0;
        self.fail_next = false;
        Ok(())
    }

    async fn disconnect(&mut self) -> DeviceResult<()> {
        self.status = DeviceStatus::Disconnected;
        self.rx_buffer.clear();
        Ok(())
    }

    async fn receive(&mut self) -> DeviceResult<Option<Frame>> {
        match self.status {
            DeviceStatus::Connected => {}
            DeviceStatus::Error => return Err("Device in error state".into()),
            DeviceStatus::Disconnected => return Err("Not connected".into()),
        }

        if std::mem::take(&mut self.fail_next) {
            self.status = DeviceStatus::Error;
            return Err("Simulated device fault".into());
        }

        if self.auto_generate && self.rx_buffer.is_empty() {
            let frame = self.generate_frame();
            self.rx_buffer.push_back(frame);
        }

        Ok(self.rx_buffer.pop_front())
    }
}
