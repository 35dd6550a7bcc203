//! Recordings: a frame sequence with a crop window, metadata, and the
//! import/export format.
//!
//! ## Export format
//!
//! ```text
//! {
//!   "metadata": { "formatVersion": 2, "generatedBy": "...", "frames": 120,
//!                 "frameRate": 57.3, "modified": "..." },
//!   "frames": [ <packing schema>, <packed frame>, <packed frame>, ... ]
//! }
//! ```
//!
//! The compressed variant is the same JSON gzip-compressed and base64-encoded,
//! conventionally saved as `.json.lz`.

pub mod format;
pub mod metadata;
#[allow(clippy::module_inception)]
pub mod recording;

pub use format::{ExportFormat, RecordingPayload};
pub use metadata::{Metadata, PACKED_FORMAT_VERSION};
pub use recording::{Recording, RecordingOptions, DEFAULT_TIME_BETWEEN_LOOPS};
