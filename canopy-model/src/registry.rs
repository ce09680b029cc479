use crate::{ModelError, ModelResult, NodeType};
use std::collections::BTreeMap;

/// `AddableTo` entry allowing a type below any parent.
pub const ANY_PARENT: &str = ".";

/// Node types known to a process, keyed by id.
///
/// Built at startup and handed to whoever needs lookups. Registering an id
/// twice keeps the latest schema.
#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    types: BTreeMap<String, NodeType>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type. Returns true if it replaced an earlier schema.
    pub fn register(&mut self, node_type: NodeType) -> bool {
        self.types
            .insert(node_type.id.clone(), node_type)
            .is_some()
    }

    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    pub fn require(&self, id: &str) -> ModelResult<&NodeType> {
        self.get(id)
            .ok_or_else(|| ModelError::UnknownNodeType(id.to_string()))
    }

    /// Ids of the types that may be added below a node of `parent_type`,
    /// sorted by id.
    pub fn addable_types(&self, parent_type: &str) -> Vec<String> {
        self.types
            .values()
            .filter(|t| {
                t.addable_to
                    .iter()
                    .any(|p| p == parent_type || p == ANY_PARENT)
            })
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
