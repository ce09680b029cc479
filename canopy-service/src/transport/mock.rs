//! In-memory daemons for tests.
//!
//! [`MemoryDaemon`] answers both info and data requests from process
//! memory. [`MemoryConnector`] hands it out for the two well-known
//! addresses and counts how often each was dialed.

use super::*;
use crate::protocol::{ErrorMessage, NODE_FILE};
use canopy_model::{NodeType, NodeTypeRegistry};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

/// Address the in-memory info daemon answers on.
pub const MEMORY_INFO_ADDRESS: &str = "memory:info";

/// Address the in-memory info daemon reports for the data service.
pub const MEMORY_DATA_ADDRESS: &str = "memory:data";

type NodeKey = (String, String);

#[derive(Debug, Default)]
struct DaemonState {
    /// Blobs by (site, path), then by file name.
    nodes: BTreeMap<NodeKey, BTreeMap<String, Vec<u8>>>,
    configs: HashMap<(String, String, String), Value>,
    types: NodeTypeRegistry,
    offline: bool,
    calls: usize,
}

/// An info and data daemon backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryDaemon {
    state: Mutex<DaemonState>,
}

impl MemoryDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with a transport error while set.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Number of calls answered so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn register_node_type(&self, node_type: NodeType) {
        self.state.lock().unwrap().types.register(node_type);
    }

    /// Stores a configuration value, served by `GetConfig`.
    pub fn put_config(&self, site: &str, module: &str, name: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .configs
            .insert((site.into(), module.into(), name.into()), value);
    }

    /// Stores raw bytes as a node's blob.
    pub fn insert_node_data(&self, site: &str, path: &str, file: &str, content: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .nodes
            .entry((site.into(), normalize(path)))
            .or_default()
            .insert(file.into(), content);
    }

    pub fn node_data(&self, site: &str, path: &str, file: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(&(site.to_string(), normalize(path)))
            .and_then(|files| files.get(file))
            .cloned()
    }

    pub fn contains_node(&self, site: &str, path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .nodes
            .contains_key(&(site.to_string(), normalize(path)))
    }

    fn handle(&self, request: ServiceRequest) -> ServiceResult<ServiceResponse> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(ServiceError::Transport("daemon is offline".into()));
        }
        state.calls += 1;

        let response = match request {
            ServiceRequest::FindDataService => {
                ServiceResponse::Address(MEMORY_DATA_ADDRESS.to_string())
            }
            ServiceRequest::GetNode(args) => ServiceResponse::Data(
                state
                    .nodes
                    .get(&(args.site, normalize(&args.path)))
                    .and_then(|files| files.get(NODE_FILE))
                    .cloned()
                    .unwrap_or_default(),
            ),
            ServiceRequest::GetChildren(args) => {
                let parent = normalize(&args.path);
                let mut children = Vec::new();
                for ((site, path), files) in &state.nodes {
                    if *site != args.site || parent_of(path) != Some(parent.as_str()) {
                        continue;
                    }
                    if let Some(document) = files.get(NODE_FILE) {
                        children.push(with_path(document, path)?);
                    }
                }
                ServiceResponse::DataList(children)
            }
            ServiceRequest::GetNodeData(args) => ServiceResponse::Data(
                state
                    .nodes
                    .get(&(args.site, normalize(&args.path)))
                    .and_then(|files| files.get(&args.file))
                    .cloned()
                    .unwrap_or_default(),
            ),
            ServiceRequest::WriteNodeData(args) => {
                state
                    .nodes
                    .entry((args.site, normalize(&args.path)))
                    .or_default()
                    .insert(args.file, args.content);
                ServiceResponse::Ack
            }
            ServiceRequest::RemoveNode(args) => {
                let root = normalize(&args.path);
                state
                    .nodes
                    .retain(|(site, path), _| *site != args.site || !is_within(path, &root));
                ServiceResponse::Ack
            }
            ServiceRequest::GetConfig(args) => {
                match state
                    .configs
                    .get(&(args.site, args.module, args.name.clone()))
                {
                    Some(value) => {
                        let mut wrapper = Map::new();
                        wrapper.insert(args.name, value.clone());
                        ServiceResponse::Data(serde_json::to_vec(&wrapper)?)
                    }
                    None => ServiceResponse::Data(Vec::new()),
                }
            }
            ServiceRequest::GetNodeType(id) => match state.types.get(&id) {
                Some(node_type) => ServiceResponse::NodeType(node_type.clone()),
                None => ServiceResponse::Error(ErrorMessage::unknown_node_type(&id)),
            },
            ServiceRequest::GetAddableNodeTypes(args) => {
                ServiceResponse::TypeIds(state.types.addable_types(&args.node_type))
            }
            ServiceRequest::RegisterNodeType(node_type) => {
                state.types.register(node_type);
                ServiceResponse::Ack
            }
        };
        Ok(response)
    }
}

#[async_trait]
impl RpcTransport for MemoryDaemon {
    async fn call(&self, request: ServiceRequest) -> ServiceResult<ServiceResponse> {
        self.handle(request)
    }
}

/// Dials a shared [`MemoryDaemon`] by its two addresses.
#[derive(Debug)]
pub struct MemoryConnector {
    daemon: Arc<MemoryDaemon>,
    info_dials: AtomicUsize,
    data_dials: AtomicUsize,
    fail_data: AtomicBool,
}

impl MemoryConnector {
    pub fn new(daemon: Arc<MemoryDaemon>) -> Self {
        Self {
            daemon,
            info_dials: AtomicUsize::new(0),
            data_dials: AtomicUsize::new(0),
            fail_data: AtomicBool::new(false),
        }
    }

    pub fn daemon(&self) -> &Arc<MemoryDaemon> {
        &self.daemon
    }

    /// Makes dialing the data service fail while set.
    pub fn fail_data_dials(&self, fail: bool) {
        self.fail_data.store(fail, Ordering::SeqCst);
    }

    pub fn info_dials(&self) -> usize {
        self.info_dials.load(Ordering::SeqCst)
    }

    pub fn data_dials(&self) -> usize {
        self.data_dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, address: &str) -> ServiceResult<Arc<dyn RpcTransport>> {
        match address {
            MEMORY_INFO_ADDRESS => {
                self.info_dials.fetch_add(1, Ordering::SeqCst);
            }
            MEMORY_DATA_ADDRESS => {
                if self.fail_data.load(Ordering::SeqCst) {
                    return Err(ServiceError::Transport(format!(
                        "could not dial {address}: connection refused"
                    )));
                }
                self.data_dials.fetch_add(1, Ordering::SeqCst);
            }
            other => {
                return Err(ServiceError::Transport(format!(
                    "could not dial {other}: no such daemon"
                )));
            }
        }
        Ok(Arc::clone(&self.daemon) as Arc<dyn RpcTransport>)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

fn is_within(path: &str, root: &str) -> bool {
    root == "/" || path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// Adds the node's path to a stored document, as the daemon reports children.
/// Documents that are not JSON objects are passed through untouched.
fn with_path(document: &[u8], path: &str) -> ServiceResult<Vec<u8>> {
    let Ok(mut object) = serde_json::from_slice::<Map<String, Value>>(document) else {
        return Ok(document.to_vec());
    };
    object.insert("Path".into(), Value::String(path.into()));
    Ok(serde_json::to_vec(&object)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(normalize("blog/2014/"), "/blog/2014");
        assert_eq!(normalize("/"), "/");
        assert_eq!(parent_of("/blog/2014"), Some("/blog"));
        assert_eq!(parent_of("/blog"), Some("/"));
        assert_eq!(parent_of("/"), None);
        assert!(is_within("/blog/2014", "/blog"));
        assert!(is_within("/blog", "/blog"));
        assert!(!is_within("/blogroll", "/blog"));
    }
}
