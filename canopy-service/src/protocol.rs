//! RPC messages exchanged with the node daemons.
//!
//! Every call is one [`ServiceRequest`] answered by one [`ServiceResponse`].
//! The info daemon answers `FindDataService`; the data daemon answers the
//! rest. Node documents and blobs travel as opaque bytes.

use crate::error::{ServiceError, ServiceResult};
use canopy_model::NodeType;
use serde::{Deserialize, Serialize};

/// File name a node's own document is stored under.
pub const NODE_FILE: &str = "node.json";

/// A request to a node daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Method", content = "Args")]
pub enum ServiceRequest {
    /// Locate the data service. Answered with an address.
    FindDataService,

    GetNode(NodeArgs),

    GetChildren(NodeArgs),

    GetNodeData(NodeDataArgs),

    WriteNodeData(WriteNodeDataArgs),

    /// Recursively remove a node and its descendants.
    RemoveNode(NodeArgs),

    GetConfig(ConfigArgs),

    GetNodeType(String),

    GetAddableNodeTypes(AddableArgs),

    RegisterNodeType(NodeType),
}

impl ServiceRequest {
    /// Fully qualified method name, used in logs and error context.
    pub fn method(&self) -> &'static str {
        match self {
            Self::FindDataService => "Info.FindDataService",
            Self::GetNode(_) => "Data.GetNode",
            Self::GetChildren(_) => "Data.GetChildren",
            Self::GetNodeData(_) => "Data.GetNodeData",
            Self::WriteNodeData(_) => "Data.WriteNodeData",
            Self::RemoveNode(_) => "Data.RemoveNode",
            Self::GetConfig(_) => "Data.GetConfig",
            Self::GetNodeType(_) => "Data.GetNodeType",
            Self::GetAddableNodeTypes(_) => "Data.GetAddableNodeTypes",
            Self::RegisterNodeType(_) => "Data.RegisterNodeType",
        }
    }
}

/// Addresses a node of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeArgs {
    pub site: String,
    pub path: String,
}

impl NodeArgs {
    pub fn new(site: &str, path: &str) -> Self {
        Self {
            site: site.into(),
            path: path.into(),
        }
    }
}

/// Addresses a named blob of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDataArgs {
    pub site: String,
    pub path: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteNodeDataArgs {
    pub site: String,
    pub path: String,
    pub file: String,
    pub content: Vec<u8>,
}

/// Addresses one configuration value as `module`/`name` of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigArgs {
    pub site: String,
    pub module: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddableArgs {
    pub site: String,
    pub node_type: String,
}

/// A daemon's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind", content = "Value")]
pub enum ServiceResponse {
    /// Nothing to return.
    Ack,

    /// A document or blob. Empty means "does not exist".
    Data(Vec<u8>),

    /// One document per child, in server order.
    DataList(Vec<Vec<u8>>),

    NodeType(NodeType),

    TypeIds(Vec<String>),

    /// Where a service can be dialed.
    Address(String),

    Error(ErrorMessage),
}

impl ServiceResponse {
    fn kind(&self) -> &'static str {
        match self {
            Self::Ack => "Ack",
            Self::Data(_) => "Data",
            Self::DataList(_) => "DataList",
            Self::NodeType(_) => "NodeType",
            Self::TypeIds(_) => "TypeIds",
            Self::Address(_) => "Address",
            Self::Error(_) => "Error",
        }
    }

    fn unexpected(self, wanted: &str) -> ServiceError {
        match self {
            Self::Error(e) => ServiceError::Remote {
                code: e.code,
                message: e.message,
            },
            other => ServiceError::Protocol(format!(
                "expected {wanted} response, got {}",
                other.kind()
            )),
        }
    }

    pub fn into_ack(self) -> ServiceResult<()> {
        match self {
            Self::Ack => Ok(()),
            other => Err(other.unexpected("Ack")),
        }
    }

    pub fn into_data(self) -> ServiceResult<Vec<u8>> {
        match self {
            Self::Data(data) => Ok(data),
            other => Err(other.unexpected("Data")),
        }
    }

    pub fn into_data_list(self) -> ServiceResult<Vec<Vec<u8>>> {
        match self {
            Self::DataList(list) => Ok(list),
            other => Err(other.unexpected("DataList")),
        }
    }

    pub fn into_node_type(self) -> ServiceResult<NodeType> {
        match self {
            Self::NodeType(node_type) => Ok(node_type),
            other => Err(other.unexpected("NodeType")),
        }
    }

    pub fn into_type_ids(self) -> ServiceResult<Vec<String>> {
        match self {
            Self::TypeIds(ids) => Ok(ids),
            other => Err(other.unexpected("TypeIds")),
        }
    }

    pub fn into_address(self) -> ServiceResult<String> {
        match self {
            Self::Address(address) => Ok(address),
            other => Err(other.unexpected("Address")),
        }
    }
}

/// Error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorMessage {
    pub code: u32,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Unknown node type.
    pub fn unknown_node_type(id: &str) -> Self {
        Self::new(2, format!("unknown node type: {id}"))
    }

    /// Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(99, msg)
    }
}
