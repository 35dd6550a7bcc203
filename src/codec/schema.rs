use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, SpyError};

/// One node of a packing schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Copy `data[key]` verbatim
    Key(String),
    /// The data is an array of records, each packed with the sub-schema.
    /// Always the only node of its enclosing schema.
    Repeated(PackingSchema),
    /// The data field `name` is a record packed with the sub-schema
    Named(String, PackingSchema),
}

/// Data-driven description of how a frame's nested fields map to a flat
/// array.
///
/// On the wire a schema is a JSON array whose elements are strings, a single
/// nested array, or single-key objects:
///
/// ```text
/// ["id", "timestamp", {"hands": [["id", "palmPosition"]]}, {"interactionBox": ["center", "size"]}]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PackingSchema {
    nodes: Vec<SchemaNode>,
}

impl PackingSchema {
    /// Build a schema from already-validated nodes
    pub fn new(nodes: Vec<SchemaNode>) -> Result<Self> {
        let schema = Self { nodes };
        schema.validate()?;
        Ok(schema)
    }

    /// Schema whose data is an array of records packed with `record`
    pub fn repeated(record: PackingSchema) -> Self {
        Self {
            nodes: vec![SchemaNode::Repeated(record)],
        }
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// The record sub-schema when this schema describes an array of records
    pub fn repeated_record(&self) -> Option<&PackingSchema> {
        match self.nodes.as_slice() {
            [SchemaNode::Repeated(sub)] => Some(sub),
            _ => None,
        }
    }

    /// Parse a schema from its JSON form
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| SpyError::Schema(format!("schema must be an array, got {}", value)))?;
        parse_nodes(items)
    }

    /// JSON form of this schema, as embedded in exported payloads
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.nodes
                .iter()
                .map(|node| match node {
                    SchemaNode::Key(key) => Value::String(key.clone()),
                    SchemaNode::Repeated(sub) => sub.to_value(),
                    SchemaNode::Named(name, sub) => {
                        let mut map = Map::new();
                        map.insert(name.clone(), sub.to_value());
                        Value::Object(map)
                    }
                })
                .collect(),
        )
    }

    /// Schema for hand-tracking frames: ids, timestamps, the hand and
    /// pointable fields that matter for replay, and the interaction box.
    pub fn leap_default() -> Self {
        let keys = |names: &[&str]| Self {
            nodes: names.iter().map(|n| SchemaNode::Key(n.to_string())).collect(),
        };

        let hand = keys(&[
            "id",
            "type",
            "direction",
            "palmNormal",
            "palmPosition",
            "palmVelocity",
            "stabilizedPalmPosition",
            "pinchStrength",
            "grabStrength",
            "confidence",
            "armBasis",
            "armWidth",
            "elbow",
            "wrist",
        ]);
        let pointable = keys(&[
            "id",
            "direction",
            "handId",
            "length",
            "stabilizedTipPosition",
            "tipPosition",
            "tipVelocity",
            "tool",
            "carpPosition",
            "mcpPosition",
            "pipPosition",
            "dipPosition",
            "btipPosition",
            "bases",
            "type",
        ]);

        Self {
            nodes: vec![
                SchemaNode::Key("id".to_string()),
                SchemaNode::Key("timestamp".to_string()),
                SchemaNode::Named("hands".to_string(), Self::repeated(hand)),
                SchemaNode::Named("pointables".to_string(), Self::repeated(pointable)),
                SchemaNode::Named("interactionBox".to_string(), keys(&["center", "size"])),
            ],
        }
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(SpyError::Schema("empty schema".to_string()));
        }
        for node in &self.nodes {
            match node {
                SchemaNode::Key(_) => {}
                SchemaNode::Repeated(sub) => {
                    if self.nodes.len() != 1 {
                        return Err(SpyError::Schema(
                            "a repeated group must be the only node of its schema".to_string(),
                        ));
                    }
                    sub.validate()?;
                }
                SchemaNode::Named(_, sub) => sub.validate()?,
            }
        }
        Ok(())
    }
}

fn parse_nodes(items: &[Value]) -> Result<PackingSchema> {
    let mut nodes = Vec::with_capacity(items.len());

    for item in items {
        let node = match item {
            Value::String(key) => SchemaNode::Key(key.clone()),
            Value::Array(inner) => SchemaNode::Repeated(parse_nodes(inner)?),
            Value::Object(map) => {
                let mut entries = map.iter();
                let (name, sub) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => {
                        return Err(SpyError::Schema(format!(
                            "group objects need exactly one key, got {}",
                            map.len()
                        )))
                    }
                };
                let sub_items = sub.as_array().ok_or_else(|| {
                    SpyError::Schema(format!("group '{}' must map to an array, got {}", name, sub))
                })?;
                SchemaNode::Named(name.clone(), parse_nodes(sub_items)?)
            }
            other => {
                return Err(SpyError::Schema(format!("unsupported schema node: {}", other)));
            }
        };
        nodes.push(node);
    }

    PackingSchema::new(nodes)
}

impl Serialize for PackingSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PackingSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PackingSchema::from_value(&value).map_err(D::Error::custom)
    }
}
