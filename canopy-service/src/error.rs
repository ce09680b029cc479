//! Error types for the service layer.

use canopy_model::ModelError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur talking to the node daemons.
///
/// A node or blob that does not exist is not an error; reads return `None`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The remote call could not complete.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote call did not answer in time.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The daemon answered with an error.
    #[error("remote error {code}: {message}")]
    Remote { code: u32, message: String },

    /// The daemon answered with an unexpected message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Wire bytes did not match the node document, or named an unknown field type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A node's type id does not resolve to a schema.
    #[error("unknown node type {type_id:?}: {reason}")]
    Schema { type_id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// An extension handler failed while contributing to a render.
    #[error("extension handler {handler:?} failed: {reason}")]
    Extension { handler: String, reason: String },

    /// The client is in a permanent error state.
    #[error("service unavailable: {0}")]
    Unavailable(Arc<ServiceError>),
}

impl ServiceError {
    /// Prefixes the message with call-site context, keeping the variant.
    pub fn context(self, ctx: impl fmt::Display) -> Self {
        match self {
            Self::Transport(m) => Self::Transport(format!("{ctx}: {m}")),
            Self::Protocol(m) => Self::Protocol(format!("{ctx}: {m}")),
            Self::Decode(m) => Self::Decode(format!("{ctx}: {m}")),
            Self::Config(m) => Self::Config(format!("{ctx}: {m}")),
            Self::Io(e) => Self::Transport(format!("{ctx}: {e}")),
            Self::Serialization(e) => Self::Decode(format!("{ctx}: {e}")),
            other => other,
        }
    }

    /// Whether the failure happened below the protocol: network, process or timeout.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::Io(_) => true,
            Self::Unavailable(inner) => inner.is_transport_failure(),
            _ => false,
        }
    }

    /// Whether a reply arrived but could not be turned into a node.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Serialization(_) | Self::Schema { .. })
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownNodeType(type_id) => Self::Schema {
                type_id,
                reason: "not registered".into(),
            },
            other => Self::Decode(other.to_string()),
        }
    }
}
