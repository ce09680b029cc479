//! Client for the data daemon: node CRUD, blobs, schemas and configuration.

use crate::codec::{EncodeMode, SchemaLookup, decode_node, encode_node};
use crate::error::{ServiceError, ServiceResult};
use crate::protocol::{
    AddableArgs, ConfigArgs, NODE_FILE, NodeArgs, NodeDataArgs, ServiceRequest, ServiceResponse,
    WriteNodeDataArgs,
};
use crate::transport::RpcTransport;
use async_trait::async_trait;
use canopy_model::{FieldRegistry, Node, NodeType};
use canopy_types::HandleId;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

enum ClientState {
    Connected(Arc<dyn RpcTransport>),
    /// Permanent error; every call short-circuits.
    Broken(Arc<ServiceError>),
}

/// A handle to the data daemon.
///
/// A client built with [`NodeClient::broken`] never touches the network.
/// Its `get_node` returns `None` and its writes are no-ops, so callers
/// chaining many calls need not check each one; list, blob, schema and
/// configuration reads return the stored error.
pub struct NodeClient {
    id: HandleId,
    state: ClientState,
    fields: Arc<FieldRegistry>,
}

impl NodeClient {
    pub fn new(transport: Arc<dyn RpcTransport>, fields: Arc<FieldRegistry>) -> Self {
        Self {
            id: HandleId::new(),
            state: ClientState::Connected(transport),
            fields,
        }
    }

    /// A client in the permanent error state.
    pub fn broken(error: ServiceError, fields: Arc<FieldRegistry>) -> Self {
        Self {
            id: HandleId::new(),
            state: ClientState::Broken(Arc::new(error)),
            fields,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The stored error of a broken client.
    pub fn error(&self) -> Option<&ServiceError> {
        match &self.state {
            ClientState::Broken(err) => Some(err),
            ClientState::Connected(_) => None,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.error().is_some()
    }

    /// Whether the handle may be cached for another session.
    pub fn is_reusable(&self) -> bool {
        match &self.state {
            ClientState::Connected(transport) => transport.is_healthy(),
            ClientState::Broken(_) => false,
        }
    }

    pub fn field_registry(&self) -> &FieldRegistry {
        &self.fields
    }

    /// Fails with [`ServiceError::Unavailable`] if the client is broken.
    pub fn check(&self) -> ServiceResult<()> {
        match &self.state {
            ClientState::Broken(err) => Err(ServiceError::Unavailable(Arc::clone(err))),
            ClientState::Connected(_) => Ok(()),
        }
    }

    async fn call(&self, request: ServiceRequest) -> ServiceResult<ServiceResponse> {
        let transport = match &self.state {
            ClientState::Connected(transport) => transport,
            ClientState::Broken(err) => return Err(ServiceError::Unavailable(Arc::clone(err))),
        };
        let method = request.method();
        debug!(handle = %self.id, method, "calling data service");
        transport
            .call(request)
            .await
            .map_err(|e| e.context(format!("{method} error")))
    }

    async fn decode(&self, data: &[u8]) -> ServiceResult<Option<Node>> {
        decode_node(data, self, &self.fields)
            .await
            .map_err(|e| e.context("could not convert node"))
    }

    // ── Nodes ────────────────────────────────────────────────────

    /// Reads the node at `path`. Returns `None` if it does not exist.
    pub async fn get_node(&self, site: &str, path: &str) -> ServiceResult<Option<Node>> {
        if self.is_broken() {
            return Ok(None);
        }
        let reply = self
            .call(ServiceRequest::GetNode(NodeArgs::new(site, path)))
            .await?
            .into_data()?;
        let node = self.decode(&reply).await?;
        Ok(node.map(|mut node| {
            node.path = path.to_string();
            node
        }))
    }

    /// Writes the node's document to `path`.
    pub async fn write_node(&self, site: &str, path: &str, node: &Node) -> ServiceResult<()> {
        if self.is_broken() {
            return Ok(());
        }
        let data = encode_node(node, EncodeMode::Indented)
            .map_err(|e| e.context("could not convert node"))?;
        self.write_node_data(site, path, NODE_FILE, data)
            .await
            .map_err(|e| e.context("could not write node"))
    }

    /// Reads the children of a node, in the order the server lists them.
    ///
    /// An empty entry is a child directory without a node document; it is
    /// skipped, not reported. Fails as a whole if any other child does not
    /// decode.
    pub async fn get_children(&self, site: &str, path: &str) -> ServiceResult<Vec<Node>> {
        self.check()?;
        let reply = self
            .call(ServiceRequest::GetChildren(NodeArgs::new(site, path)))
            .await?
            .into_data_list()?;
        let mut nodes = Vec::with_capacity(reply.len());
        for entry in reply {
            if let Some(node) = self.decode(&entry).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Recursively removes a node. Removing a missing node succeeds.
    pub async fn remove_node(&self, site: &str, path: &str) -> ServiceResult<()> {
        if self.is_broken() {
            return Ok(());
        }
        self.call(ServiceRequest::RemoveNode(NodeArgs::new(site, path)))
            .await?
            .into_ack()
    }

    // ── Blobs ────────────────────────────────────────────────────

    /// Reads a named blob of a node. Returns `None` if it does not exist.
    pub async fn get_node_data(
        &self,
        site: &str,
        path: &str,
        file: &str,
    ) -> ServiceResult<Option<Vec<u8>>> {
        let data = self
            .call(ServiceRequest::GetNodeData(NodeDataArgs {
                site: site.into(),
                path: path.into(),
                file: file.into(),
            }))
            .await?
            .into_data()?;
        Ok((!data.is_empty()).then_some(data))
    }

    /// Writes a named blob of a node.
    pub async fn write_node_data(
        &self,
        site: &str,
        path: &str,
        file: &str,
        content: Vec<u8>,
    ) -> ServiceResult<()> {
        if self.is_broken() {
            return Ok(());
        }
        self.call(ServiceRequest::WriteNodeData(WriteNodeDataArgs {
            site: site.into(),
            path: path.into(),
            file: file.into(),
            content,
        }))
        .await?
        .into_ack()
    }

    // ── Configuration ────────────────────────────────────────────

    /// Reads the configuration value `module`/`name` of a site.
    ///
    /// The daemon wraps the value as `{"<name>": value}`; the wrapper is
    /// removed here. A missing or `null` value yields `None`.
    pub async fn get_config<T>(&self, site: &str, module: &str, name: &str) -> ServiceResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let reply = self
            .call(ServiceRequest::GetConfig(ConfigArgs {
                site: site.into(),
                module: module.into(),
                name: name.into(),
            }))
            .await?
            .into_data()?;
        unwrap_config(&reply).map_err(|e| e.context(format!("could not decode configuration {module}.{name}")))
    }

    // ── Schemas ──────────────────────────────────────────────────

    pub async fn get_node_type(&self, id: &str) -> ServiceResult<NodeType> {
        self.call(ServiceRequest::GetNodeType(id.into()))
            .await?
            .into_node_type()
    }

    /// Ids of the node types that may be added below a node of `node_type`.
    pub async fn get_addable_node_types(
        &self,
        site: &str,
        node_type: &str,
    ) -> ServiceResult<Vec<String>> {
        self.call(ServiceRequest::GetAddableNodeTypes(AddableArgs {
            site: site.into(),
            node_type: node_type.into(),
        }))
        .await?
        .into_type_ids()
    }

    /// Registers a node type with the daemon. Re-registering replaces it.
    pub async fn register_node_type(&self, node_type: &NodeType) -> ServiceResult<()> {
        if self.is_broken() {
            return Ok(());
        }
        self.call(ServiceRequest::RegisterNodeType(node_type.clone()))
            .await?
            .into_ack()
    }
}

#[async_trait]
impl SchemaLookup for NodeClient {
    async fn node_type(&self, id: &str) -> ServiceResult<NodeType> {
        self.get_node_type(id).await
    }
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient")
            .field("id", &self.id)
            .field("error", &self.error())
            .finish()
    }
}

fn unwrap_config<T: DeserializeOwned>(reply: &[u8]) -> ServiceResult<Option<T>> {
    if reply.is_empty() {
        return Ok(None);
    }
    let wrapper: Map<String, Value> = serde_json::from_slice(reply)
        .map_err(|e| ServiceError::Decode(e.to_string()))?;
    match wrapper.into_iter().next() {
        None | Some((_, Value::Null)) => Ok(None),
        Some((_, value)) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ServiceError::Decode(e.to_string())),
    }
}
