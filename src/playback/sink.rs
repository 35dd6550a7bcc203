use std::sync::mpsc::Sender;

use crate::core::Frame;

/// Consumer of delivered frames, live or played back
pub trait FrameSink {
    fn deliver(&mut self, frame: &Frame);
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame),
{
    fn deliver(&mut self, frame: &Frame) {
        self(frame)
    }
}

impl FrameSink for Sender<Frame> {
    fn deliver(&mut self, frame: &Frame) {
        if self.send(frame.clone()).is_err() {
            tracing::trace!("frame receiver dropped");
        }
    }
}

/// Decides whether a live frame should interrupt playback
pub type LiveGate = Box<dyn FnMut(&Frame) -> bool>;

/// Gate that interrupts playback whenever a hand is in view
pub fn pause_on_hand() -> LiveGate {
    Box::new(|frame: &Frame| frame.has_hands())
}
