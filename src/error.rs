use thiserror::Error;

use crate::playback::PlayerState;

/// Errors raised by the capture/playback engine and the frame codec.
///
/// Codec and state errors indicate a programming or data-corruption defect
/// and are always returned to the caller.
#[derive(Debug, Error)]
pub enum SpyError {
    /// The packing schema has a node the codec cannot interpret
    #[error("malformed packing schema: {0}")]
    Schema(String),

    /// A packed payload does not match the shape of its schema
    #[error("packed payload does not match schema: {0}")]
    Decode(String),

    /// The requested transition is not allowed from the current state
    #[error("cannot {action} while {state}")]
    State {
        action: &'static str,
        state: PlayerState,
    },

    /// Frame buffers need room for at least one frame
    #[error("frame buffer capacity must be at least 1, got {0}")]
    Capacity(usize),

    #[error("invalid recording JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpyError>;

impl SpyError {
    pub(crate) fn state(action: &'static str, state: PlayerState) -> Self {
        SpyError::State { action, state }
    }
}
