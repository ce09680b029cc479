use crate::{Field, FieldRegistry, ModelError, ModelResult, NodeType};
use canopy_types::Timestamp;
use std::collections::BTreeMap;

/// One element of a site's content tree.
///
/// `fields` holds exactly the fields declared by `node_type`; fields that
/// were never set carry their zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Slash-delimited location in the tree. Derived from where the node is
    /// stored, so it is not part of the node's own document.
    pub path: String,
    pub node_type: NodeType,
    pub fields: BTreeMap<String, Field>,
    pub publish_time: Timestamp,
    pub hide: bool,
    /// Position among siblings.
    pub order: i32,
}

impl Node {
    /// Creates a node with every declared field set to its zero value.
    pub fn new(
        path: impl Into<String>,
        node_type: NodeType,
        registry: &FieldRegistry,
    ) -> ModelResult<Self> {
        let fields = node_type
            .fields
            .iter()
            .map(|f| -> ModelResult<(String, Field)> { Ok((f.id.clone(), registry.zero(f)?)) })
            .collect::<ModelResult<_>>()?;
        Ok(Self {
            path: path.into(),
            node_type,
            fields,
            publish_time: Timestamp::zero(),
            hide: false,
            order: 0,
        })
    }

    pub fn type_id(&self) -> &str {
        &self.node_type.id
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Sets a declared field. Undeclared ids are rejected.
    pub fn set_field(&mut self, id: &str, value: Field) -> ModelResult<()> {
        if self.node_type.field(id).is_none() {
            return Err(ModelError::UndeclaredField {
                field_id: id.into(),
                node_type: self.node_type.id.clone(),
            });
        }
        self.fields.insert(id.into(), value);
        Ok(())
    }

    /// String content of a text-like field.
    pub fn get_str(&self, id: &str) -> Option<&str> {
        self.field(id).and_then(Field::as_str)
    }

    /// Last path segment, i.e. the node's name within its parent.
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}
