use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The nested field document of a node as it appears on the wire.
///
/// A dotted field id such as `address.city` addresses the `city` key inside
/// the `address` object. Lookups through missing or non-object segments
/// yield `None`; they are never errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldData(Map<String, Value>);

impl FieldData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value at the dotted id, if every segment is present.
    pub fn get(&self, id: &str) -> Option<&Value> {
        let mut segments = id.split('.');
        let first = segments.next()?;
        segments.try_fold(self.0.get(first)?, |value, segment| {
            value.as_object()?.get(segment)
        })
    }

    /// Stores a value at the dotted id, creating intermediate objects.
    ///
    /// An intermediate segment holding a non-object value is replaced by an
    /// object.
    pub fn set(&mut self, id: &str, value: Value) {
        let (parents, leaf) = match id.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, id),
        };
        let mut map = &mut self.0;
        for segment in parents.into_iter().flat_map(|p| p.split('.')) {
            let slot = map
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            map = match slot {
                Value::Object(inner) => inner,
                _ => unreachable!("slot was just made an object"),
            };
        }
        map.insert(leaf.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for FieldData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
