use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{self, PackingSchema};
use crate::core::Frame;
use crate::error::{Result, SpyError};
use crate::recording::metadata::Metadata;

/// Extension marking the compressed text variant
pub const COMPRESSED_EXTENSION: &str = ".lz";

/// Export encodings for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain JSON
    Json,
    /// JSON passed through [`codec::compress`]
    Compressed,
}

impl ExportFormat {
    /// Pick the format from a file-name-like hint; the content is never sniffed
    pub fn from_hint(hint: &str) -> Self {
        if hint.ends_with(COMPRESSED_EXTENSION) {
            ExportFormat::Compressed
        } else {
            ExportFormat::Json
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => ".json",
            ExportFormat::Compressed => ".json.lz",
        }
    }
}

/// The persisted form of a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingPayload {
    pub metadata: Metadata,
    /// `[schema, packed...]` when the metadata is version 2, raw frame
    /// objects otherwise
    pub frames: Value,
}

impl RecordingPayload {
    pub fn packed(metadata: Metadata, schema: &PackingSchema, frames: &[Frame]) -> Result<Self> {
        Ok(Self {
            metadata,
            frames: codec::pack_all(schema, frames)?,
        })
    }

    /// Decode the frames, unpacking them if the metadata says they are packed
    pub fn decode_frames(&self) -> Result<Vec<Frame>> {
        if self.metadata.is_packed() {
            return codec::unpack_all(&self.frames);
        }

        let items = self
            .frames
            .as_array()
            .ok_or_else(|| SpyError::Decode("raw frames must be an array".to_string()))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Frame::try_from(item.clone())
                    .map_err(|v| SpyError::Decode(format!("frame {} is not an object: {}", i, v)))
            })
            .collect()
    }

    pub fn encode(&self, format: ExportFormat) -> Result<String> {
        let json = serde_json::to_string(self)?;
        match format {
            ExportFormat::Json => Ok(json),
            ExportFormat::Compressed => codec::compress(&json),
        }
    }

    pub fn decode(text: &str, format: ExportFormat) -> Result<Self> {
        let payload = match format {
            ExportFormat::Json => serde_json::from_str(text)?,
            ExportFormat::Compressed => serde_json::from_str(&codec::decompress(text)?)?,
        };
        Ok(payload)
    }
}
