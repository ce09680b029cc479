//! Polymorphic field values and the loader registry.
//!
//! A node's schema names each field's type as a string. Decoding looks that
//! name up in a [`FieldRegistry`] to find the loader producing the matching
//! [`Field`] variant. A new field type is one more registry entry.

use crate::{ModelError, ModelResult, NodeField};
use canopy_types::Timestamp;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// A typed field value owned by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Plain text.
    Text(String),
    /// Markup, stored as is. Sanitizing is up to the renderer.
    Html(String),
    DateTime(Timestamp),
    /// Logical file name; the bytes are node data blobs.
    File(String),
}

impl Field {
    /// The schema type name this variant is registered under by default.
    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Text(_) => "Text",
            Field::Html(_) => "HTMLArea",
            Field::DateTime(_) => "DateTime",
            Field::File(_) => "File",
        }
    }

    /// Converts the value into its wire representation.
    pub fn dump(&self) -> Value {
        match self {
            Field::Text(s) | Field::Html(s) | Field::File(s) => Value::String(s.clone()),
            Field::DateTime(ts) => Value::String(ts.encode()),
        }
    }

    /// The string content of text-like fields.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Text(s) | Field::Html(s) | Field::File(s) => Some(s),
            Field::DateTime(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Field::DateTime(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Builds a field from its raw wire value. `None` means the document did not
/// contain the field and must produce the type's zero value.
pub type FieldLoader = fn(&NodeField, Option<&Value>) -> ModelResult<Field>;

/// Maps schema field type names to loaders.
#[derive(Clone)]
pub struct FieldRegistry {
    loaders: HashMap<String, FieldLoader>,
}

impl FieldRegistry {
    /// A registry with no field types at all.
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// A registry with the built-in `Text`, `HTMLArea`, `DateTime` and
    /// `File` types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("Text", load_text);
        registry.register("HTMLArea", load_html);
        registry.register("DateTime", load_datetime);
        registry.register("File", load_file);
        registry
    }

    /// Registers a loader, replacing any previous loader for the name.
    pub fn register(&mut self, field_type: impl Into<String>, loader: FieldLoader) {
        self.loaders.insert(field_type.into(), loader);
    }

    pub fn contains(&self, field_type: &str) -> bool {
        self.loaders.contains_key(field_type)
    }

    /// Loads one field of a node from its raw value.
    pub fn load(&self, field: &NodeField, raw: Option<&Value>) -> ModelResult<Field> {
        let loader =
            self.loaders
                .get(&field.field_type)
                .ok_or_else(|| ModelError::UnknownFieldType {
                    field_id: field.id.clone(),
                    field_type: field.field_type.clone(),
                })?;
        loader(field, raw)
    }

    /// The zero value of a declared field.
    pub fn zero(&self, field: &NodeField) -> ModelResult<Field> {
        self.load(field, None)
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.loaders.keys().collect();
        names.sort();
        f.debug_struct("FieldRegistry").field("types", &names).finish()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(n) => format!("number {n}"),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

fn load_string(field: &NodeField, raw: Option<&Value>) -> ModelResult<String> {
    match raw {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ModelError::InvalidFieldValue {
            field_id: field.id.clone(),
            expected: "string",
            found: describe(other),
        }),
    }
}

fn load_text(field: &NodeField, raw: Option<&Value>) -> ModelResult<Field> {
    load_string(field, raw).map(Field::Text)
}

fn load_html(field: &NodeField, raw: Option<&Value>) -> ModelResult<Field> {
    load_string(field, raw).map(Field::Html)
}

fn load_file(field: &NodeField, raw: Option<&Value>) -> ModelResult<Field> {
    load_string(field, raw).map(Field::File)
}

fn load_datetime(field: &NodeField, raw: Option<&Value>) -> ModelResult<Field> {
    let raw = load_string(field, raw)?;
    if raw.is_empty() {
        return Ok(Field::DateTime(Timestamp::zero()));
    }
    Timestamp::parse(&raw)
        .map(Field::DateTime)
        .map_err(|_| ModelError::InvalidFieldValue {
            field_id: field.id.clone(),
            expected: "RFC 3339 timestamp",
            found: format!("{raw:?}"),
        })
}
