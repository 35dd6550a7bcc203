use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One timestamped snapshot of tracked hands and pointables.
///
/// Frames are kept as the JSON object the device produced so that fields
/// this crate knows nothing about survive capture, export and replay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    fields: Map<String, Value>,
}

impl Frame {
    /// Create a frame with only `id` and `timestamp` (microseconds) set
    pub fn new(id: i64, timestamp: i64) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(id));
        fields.insert("timestamp".to_string(), Value::from(timestamp));
        Self { fields }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Source frame id
    pub fn id(&self) -> Option<i64> {
        self.fields.get("id").and_then(as_integer)
    }

    /// Device timestamp in microseconds
    pub fn timestamp(&self) -> Option<i64> {
        self.fields.get("timestamp").and_then(as_integer)
    }

    pub fn hands(&self) -> &[Value] {
        self.array_field("hands")
    }

    pub fn pointables(&self) -> &[Value] {
        self.array_field("pointables")
    }

    /// True when the device reports at least one hand in view
    pub fn has_hands(&self) -> bool {
        !self.hands().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn array_field(&self, key: &str) -> &[Value] {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }
}

impl From<Map<String, Value>> for Frame {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for Frame {
    type Error = Value;

    /// Only JSON objects are frames; anything else is handed back
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Linear interpolation between two numeric triples.
///
/// Returns `None` unless both sides are arrays of exactly three numbers.
pub fn lerp_vec3(from: &Value, to: &Value, t: f64) -> Option<Value> {
    let a = vec3(from)?;
    let b = vec3(to)?;
    let out: Vec<Value> = (0..3).map(|i| Value::from(a[i] + (b[i] - a[i]) * t)).collect();
    Some(Value::Array(out))
}

fn vec3(value: &Value) -> Option<[f64; 3]> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
        _ => None,
    }
}
