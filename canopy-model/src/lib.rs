//! Node model for Canopy.
//!
//! Defines the types that cross the process boundary between the front-end
//! and the data daemons:
//! - [`Node`]: one element of a site's content tree (path, type, typed fields)
//! - [`NodeType`] / [`NodeField`]: the schema a node is decoded against
//! - [`Field`]: a closed set of field value kinds, loaded through a
//!   [`FieldRegistry`] keyed by the schema's field type name
//! - [`FieldData`]: the nested document fields live in on the wire, addressed
//!   by dotted field ids
//! - [`NodeTypeRegistry`]: an explicit, process-local schema registry
//!
//! Nothing here performs I/O; the service crate moves these types over RPC.

mod field;
mod field_data;
mod node;
mod registry;
mod schema;

pub use field::{Field, FieldLoader, FieldRegistry};
pub use field_data::FieldData;
pub use node::Node;
pub use registry::{NodeTypeRegistry, ANY_PARENT};
pub use schema::{EmbedNode, NodeField, NodeType};

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or decoding nodes.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The schema names a field type no loader is registered for.
    #[error("unknown field type {field_type:?} for field {field_id:?}")]
    UnknownFieldType { field_id: String, field_type: String },

    /// A raw field value has the wrong shape for its declared type.
    #[error("invalid value for field {field_id:?}: expected {expected}, found {found}")]
    InvalidFieldValue {
        field_id: String,
        expected: &'static str,
        found: String,
    },

    /// A field id that the node's type does not declare.
    #[error("field {field_id:?} is not declared by node type {node_type:?}")]
    UndeclaredField { field_id: String, node_type: String },

    /// A node type id with no registered schema.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),
}
