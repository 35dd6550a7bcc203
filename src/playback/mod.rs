pub mod engine;
pub mod sink;
pub mod task;

pub use engine::PlaybackEngine;
pub use sink::{pause_on_hand, FrameSink, LiveGate};
pub use task::RepeatingTask;

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Recording,
    Playing,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Recording => write!(f, "recording"),
            PlayerState::Playing => write!(f, "playing"),
        }
    }
}

/// Options for one play session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Restart at the crop start instead of stopping at the crop end
    pub loop_playback: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            loop_playback: true,
        }
    }
}

/// Legacy shorthand: a bare flag means "loop or not"
impl From<bool> for PlaybackOptions {
    fn from(loop_playback: bool) -> Self {
        Self { loop_playback }
    }
}
