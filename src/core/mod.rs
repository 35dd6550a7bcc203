pub mod buffer;
pub mod events;
pub mod frame;

pub use buffer::{BufferSnapshot, CapturedFrame, FrameBuffer, DEFAULT_MAX_FRAMES};
pub use events::{EngineEvents, EventChannel};
pub use frame::{lerp_vec3, Frame};
