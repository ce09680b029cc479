//! Node transport codec.
//!
//! Converts a [`Node`] to and from the JSON document stored by the data
//! daemon:
//!
//! ```json
//! {"PublishTime": "...", "Hide": false, "Order": 0,
//!  "Type": "core.Document", "Fields": {"core": {"Title": "..."}}}
//! ```
//!
//! The node's path is where the document lives, so it is not written into
//! the document. Encoding borrows the node immutably; the caller's node
//! keeps its path on every exit path.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use canopy_model::{Field, FieldData, FieldRegistry, Node, NodeType, NodeTypeRegistry};
use canopy_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Output layout of [`encode_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    /// Single line, for machine-only storage.
    #[default]
    Compact,
    /// Two-space indented, for documents people diff and edit.
    Indented,
}

/// Resolves node type ids to schemas while decoding.
#[async_trait]
pub trait SchemaLookup: Send + Sync {
    async fn node_type(&self, id: &str) -> ServiceResult<NodeType>;
}

#[async_trait]
impl SchemaLookup for NodeTypeRegistry {
    async fn node_type(&self, id: &str) -> ServiceResult<NodeType> {
        Ok(self.require(id)?.clone())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NodeDocumentRef<'a> {
    publish_time: Timestamp,
    hide: bool,
    order: i32,
    #[serde(rename = "Type")]
    type_id: &'a str,
    fields: FieldData,
}

/// A decoded node document whose type has not been resolved yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDocument {
    /// Present when the server stores or reports it, e.g. for children.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub publish_time: Timestamp,
    #[serde(default)]
    pub hide: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "Type")]
    pub type_id: String,
    #[serde(default)]
    pub fields: FieldData,
}

impl NodeDocument {
    /// Parses a document. Empty input means "no such node".
    pub fn parse(data: &[u8]) -> ServiceResult<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(data)
            .map(Some)
            .map_err(|e| ServiceError::Decode(format!("could not unmarshal node: {e}")))
    }

    /// Builds the node against its resolved type.
    ///
    /// Every declared field is loaded, from its document value if present and
    /// as a zero value otherwise. Fields in the document that the type does
    /// not declare are ignored.
    pub fn into_node(self, node_type: NodeType, fields: &FieldRegistry) -> ServiceResult<Node> {
        let values = node_type
            .fields
            .iter()
            .map(|declared| -> ServiceResult<(String, Field)> {
                let field = fields.load(declared, self.fields.get(&declared.id))?;
                Ok((declared.id.clone(), field))
            })
            .collect::<ServiceResult<_>>()?;
        Ok(Node {
            path: self.path,
            node_type,
            fields: values,
            publish_time: self.publish_time,
            hide: self.hide,
            order: self.order,
        })
    }
}

/// Encodes a node into its wire document, without its path.
pub fn encode_node(node: &Node, mode: EncodeMode) -> ServiceResult<Vec<u8>> {
    let mut fields = FieldData::new();
    for (id, field) in &node.fields {
        fields.set(id, field.dump());
    }
    let document = NodeDocumentRef {
        publish_time: node.publish_time,
        hide: node.hide,
        order: node.order,
        type_id: &node.node_type.id,
        fields,
    };
    let encoded = match mode {
        EncodeMode::Compact => serde_json::to_vec(&document),
        EncodeMode::Indented => serde_json::to_vec_pretty(&document),
    };
    Ok(encoded?)
}

/// Decodes a wire document into a node.
///
/// Returns `Ok(None)` for empty input. The node's type is resolved through
/// `lookup`; no partial node is ever returned.
pub async fn decode_node(
    data: &[u8],
    lookup: &dyn SchemaLookup,
    fields: &FieldRegistry,
) -> ServiceResult<Option<Node>> {
    let Some(document) = NodeDocument::parse(data)? else {
        return Ok(None);
    };
    let node_type = lookup
        .node_type(&document.type_id)
        .await
        .map_err(|e| match e {
            ServiceError::Remote { message, .. } => ServiceError::Schema {
                type_id: document.type_id.clone(),
                reason: message,
            },
            other => other.context(format!("could not get node type {:?}", document.type_id)),
        })?;
    document.into_node(node_type, fields).map(Some)
}
