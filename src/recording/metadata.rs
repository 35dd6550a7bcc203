use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Format version that selects the packed frame representation
pub const PACKED_FORMAT_VERSION: u32 = 2;

pub const DEFAULT_GENERATED_BY: &str = concat!("frame-spy ", env!("CARGO_PKG_VERSION"));

/// Descriptive header stored alongside exported frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// `Some(2)` for packed payloads; anything else means raw frame objects
    #[serde(
        default,
        deserialize_with = "lenient_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub format_version: Option<u32>,
    #[serde(default)]
    pub generated_by: String,
    /// Frames inside the crop window
    #[serde(default)]
    pub frames: usize,
    #[serde(default, deserialize_with = "number_or_string")]
    pub frame_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<Value>,
    /// Keys written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            format_version: Some(PACKED_FORMAT_VERSION),
            generated_by: DEFAULT_GENERATED_BY.to_string(),
            frames: 0,
            frame_rate: 0.0,
            title: None,
            modified: None,
            protocol_version: None,
            service_version: None,
            extra: Map::new(),
        }
    }
}

impl Metadata {
    pub fn is_packed(&self) -> bool {
        self.format_version == Some(PACKED_FORMAT_VERSION)
    }
}

/// Accepts `2` or `"2"`; any other shape reads as no version (raw frames)
fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let version = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(version)
}

/// Older exports wrote the frame rate as a precision-formatted string
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(0.0)),
        _ => Ok(0.0),
    }
}
