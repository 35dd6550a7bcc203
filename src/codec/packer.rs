use serde_json::{Map, Value};

use crate::codec::schema::{PackingSchema, SchemaNode};
use crate::core::Frame;
use crate::error::{Result, SpyError};

/// Pack one frame into its positional array form.
///
/// Output order mirrors the schema node order. Fields the frame does not
/// have are packed as `null`.
pub fn pack(schema: &PackingSchema, frame: &Frame) -> Result<Value> {
    if schema.repeated_record().is_some() {
        return Err(SpyError::Schema(
            "a frame schema must describe a record, not an array".to_string(),
        ));
    }
    Ok(Value::Array(pack_record(schema, frame.fields())))
}

/// Inverse of [`pack`]
pub fn unpack(schema: &PackingSchema, packed: &Value) -> Result<Frame> {
    match unpack_value(schema, packed, "frame")? {
        Value::Object(fields) => Ok(Frame::from(fields)),
        _ => Err(SpyError::Schema(
            "a frame schema must describe a record, not an array".to_string(),
        )),
    }
}

/// Pack a frame list behind its schema header: `[schema, frame0, frame1, ...]`
pub fn pack_all(schema: &PackingSchema, frames: &[Frame]) -> Result<Value> {
    let mut out = Vec::with_capacity(frames.len() + 1);
    out.push(schema.to_value());
    for frame in frames {
        out.push(pack(schema, frame)?);
    }
    Ok(Value::Array(out))
}

/// Unpack a payload produced by [`pack_all`], reading the schema from its
/// first element
pub fn unpack_all(payload: &Value) -> Result<Vec<Frame>> {
    let items = payload
        .as_array()
        .ok_or_else(|| SpyError::Decode("packed payload must be an array".to_string()))?;

    let (header, packed_frames) = match items.split_first() {
        Some((header @ Value::Array(_), rest)) => (header, rest),
        _ => {
            return Err(SpyError::Decode(
                "packed payload is missing its schema header".to_string(),
            ))
        }
    };

    let schema = PackingSchema::from_value(header)?;
    packed_frames
        .iter()
        .map(|packed| unpack(&schema, packed))
        .collect()
}

fn pack_value(schema: &PackingSchema, data: &Value) -> Value {
    match schema.repeated_record() {
        Some(record) => {
            let items = data.as_array().map(Vec::as_slice).unwrap_or(&[]);
            Value::Array(items.iter().map(|item| pack_value(record, item)).collect())
        }
        None => {
            let empty = Map::new();
            let fields = data.as_object().unwrap_or(&empty);
            Value::Array(pack_record(schema, fields))
        }
    }
}

fn pack_record(schema: &PackingSchema, fields: &Map<String, Value>) -> Vec<Value> {
    schema
        .nodes()
        .iter()
        .map(|node| match node {
            SchemaNode::Key(key) => fields.get(key).cloned().unwrap_or(Value::Null),
            SchemaNode::Named(name, sub) => match fields.get(name) {
                None | Some(Value::Null) => Value::Null,
                Some(value) => pack_value(sub, value),
            },
            // validated schemas only hold repeated groups as their sole node
            SchemaNode::Repeated(_) => Value::Null,
        })
        .collect()
}

fn unpack_value(schema: &PackingSchema, packed: &Value, path: &str) -> Result<Value> {
    let items = packed.as_array().ok_or_else(|| {
        SpyError::Decode(format!("expected an array at '{}', got {}", path, packed))
    })?;

    if let Some(record) = schema.repeated_record() {
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| unpack_value(record, item, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array);
    }

    if items.len() != schema.nodes().len() {
        return Err(SpyError::Decode(format!(
            "'{}' has {} packed values but its schema has {} fields",
            path,
            items.len(),
            schema.nodes().len()
        )));
    }

    let mut out = Map::new();
    for (node, value) in schema.nodes().iter().zip(items) {
        if value.is_null() {
            continue;
        }
        match node {
            SchemaNode::Key(key) => {
                out.insert(key.clone(), value.clone());
            }
            SchemaNode::Named(name, sub) => {
                let nested = unpack_value(sub, value, &format!("{}.{}", path, name))?;
                out.insert(name.clone(), nested);
            }
            SchemaNode::Repeated(_) => {}
        }
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> Frame {
        Frame::try_from(value).unwrap()
    }

    fn hands_schema() -> PackingSchema {
        PackingSchema::from_value(&json!(["id", {"hands": [["id", "palmPosition"]]}])).unwrap()
    }

    #[test]
    fn test_pack_hands_example() {
        let schema = hands_schema();
        let original = frame(json!({"id": 7, "hands": [{"id": 1, "palmPosition": [1, 2, 3]}]}));

        let packed = pack(&schema, &original).unwrap();
        assert_eq!(packed, json!([7, [[1, [1, 2, 3]]]]));

        let unpacked = unpack(&schema, &packed).unwrap();
        assert_eq!(unpacked, original);
    }

    #[test]
    fn test_named_group_and_missing_fields() {
        let schema = PackingSchema::from_value(&json!([
            "id",
            "timestamp",
            {"interactionBox": ["center", "size"]}
        ]))
        .unwrap();

        let original = frame(json!({"id": 3, "interactionBox": {"center": [0, 200, 0]}}));
        let packed = pack(&schema, &original).unwrap();
        assert_eq!(packed, json!([3, null, [[0, 200, 0], null]]));

        // absent fields come back absent, not defaulted
        let unpacked = unpack(&schema, &packed).unwrap();
        assert_eq!(unpacked, original);
        assert!(unpacked.get("timestamp").is_none());
    }

    #[test]
    fn test_fields_outside_schema_are_dropped() {
        let schema = hands_schema();
        let original = frame(json!({"id": 1, "hands": [], "gestures": [1, 2]}));

        let unpacked = unpack(&schema, &pack(&schema, &original).unwrap()).unwrap();
        assert_eq!(unpacked, frame(json!({"id": 1, "hands": []})));
    }

    #[test]
    fn test_depth_mismatch_is_decode_error() {
        let schema = hands_schema();

        let err = unpack(&schema, &json!([7, 5])).unwrap_err();
        assert!(matches!(err, SpyError::Decode(_)));

        let err = unpack(&schema, &json!([7])).unwrap_err();
        assert!(matches!(err, SpyError::Decode(_)));

        let err = unpack(&schema, &json!({"id": 7})).unwrap_err();
        assert!(matches!(err, SpyError::Decode(_)));
    }

    #[test]
    fn test_pack_all_round_trip() {
        let schema = PackingSchema::leap_default();
        let frames = vec![
            frame(json!({
                "id": 1,
                "timestamp": 1000,
                "hands": [{"id": 4, "type": "left", "palmPosition": [0.5, 120.0, -3.0]}],
                "pointables": [{"id": 40, "handId": 4, "tipPosition": [1, 2, 3], "tool": false}],
                "interactionBox": {"center": [0, 200, 0], "size": [235, 235, 147]}
            })),
            frame(json!({
                "id": 2,
                "timestamp": 17000,
                "hands": [],
                "pointables": [],
                "interactionBox": {"center": [0, 200, 0], "size": [235, 235, 147]}
            })),
        ];

        let payload = pack_all(&schema, &frames).unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 3);
        assert_eq!(payload[0], schema.to_value());

        assert_eq!(unpack_all(&payload).unwrap(), frames);
    }

    #[test]
    fn test_unpack_all_requires_header() {
        let err = unpack_all(&json!([])).unwrap_err();
        assert!(matches!(err, SpyError::Decode(_)));

        let err = unpack_all(&json!([7, [1]])).unwrap_err();
        assert!(matches!(err, SpyError::Decode(_)));

        let err = unpack_all(&json!([["id", 4], [1, 2]])).unwrap_err();
        assert!(matches!(err, SpyError::Schema(_)));
    }
}
