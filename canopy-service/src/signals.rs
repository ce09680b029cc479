//! Extension hooks invoked while a node is rendered.
//!
//! Plugins register a [`NodeContextHandler`] with the [`SignalRegistry`].
//! For each render, every handler is asked in registration order whether it
//! has anything to contribute for the node's type: template fragments and
//! cache directives. A handler either handles the node, declines it, or
//! fails, which fails the render.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use canopy_model::EmbedNode;
use canopy_types::{RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A rendered result depends on the node at `node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheDep {
    pub node: String,
    /// How many levels below `node` also invalidate the result. Zero means
    /// the node itself only.
    #[serde(default)]
    pub descend: u32,
}

impl CacheDep {
    pub fn node(path: impl Into<String>) -> Self {
        Self {
            node: path.into(),
            descend: 0,
        }
    }

    pub fn descending(path: impl Into<String>, levels: u32) -> Self {
        Self {
            node: path.into(),
            descend: levels,
        }
    }
}

/// Cache directives a handler attaches to its contribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CacheMods {
    #[serde(default)]
    pub deps: Vec<CacheDep>,
    /// The result must not be served after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<Timestamp>,
}

impl CacheMods {
    pub fn with_dep(mut self, dep: CacheDep) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn expiring_at(mut self, at: Timestamp) -> Self {
        self.expire = Some(at);
        self
    }

    /// Combines two sets of directives.
    ///
    /// Dependencies on the same node keep the deeper `descend`; the earlier
    /// expiry wins.
    pub fn merge(&mut self, other: CacheMods) {
        for dep in other.deps {
            match self.deps.iter_mut().find(|d| d.node == dep.node) {
                Some(existing) => existing.descend = existing.descend.max(dep.descend),
                None => self.deps.push(dep),
            }
        }
        self.expire = match (self.expire, other.expire) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}

/// What a handler contributes to a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContext {
    /// Template fragments by name.
    pub fragments: HashMap<String, Vec<u8>>,
    pub cache: Option<CacheMods>,
}

impl NodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragment(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.fragments.insert(name.into(), content.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheMods) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.cache.is_none()
    }

    /// Adds `other`'s contribution. Fragments of the same name are replaced.
    pub fn merge(&mut self, other: NodeContext) {
        self.fragments.extend(other.fragments);
        match (&mut self.cache, other.cache) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (mine @ None, theirs) => *mine = theirs,
            (Some(_), None) => {}
        }
    }
}

/// A handler's answer for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled(NodeContext),
    /// The handler has nothing to do with this node type.
    Declined,
}

/// Contributes render context for nodes of the types it knows.
#[async_trait]
pub trait NodeContextHandler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        "anonymous"
    }

    async fn node_context(
        &self,
        request: RequestId,
        node_type: &str,
        embed: Option<&EmbedNode>,
    ) -> anyhow::Result<HandlerOutcome>;
}

/// Adapts a plain function into a [`NodeContextHandler`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(RequestId, &str, Option<&EmbedNode>) -> anyhow::Result<HandlerOutcome> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> NodeContextHandler for FnHandler<F>
where
    F: Fn(RequestId, &str, Option<&EmbedNode>) -> anyhow::Result<HandlerOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn node_context(
        &self,
        request: RequestId,
        node_type: &str,
        embed: Option<&EmbedNode>,
    ) -> anyhow::Result<HandlerOutcome> {
        (self.func)(request, node_type, embed)
    }
}

/// Merged result of asking every handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub context: NodeContext,
    /// Names of the handlers that handled the node, in invocation order.
    pub handled: Vec<String>,
}

/// Registered extension handlers, in registration order.
#[derive(Default, Clone)]
pub struct SignalRegistry {
    handlers: Vec<Arc<dyn NodeContextHandler>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn NodeContextHandler>) {
        debug!(handler = handler.name(), "registered node context handler");
        self.handlers.push(handler);
    }

    /// Registers a plain function as a handler.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(RequestId, &str, Option<&EmbedNode>) -> anyhow::Result<HandlerOutcome>
            + Send
            + Sync
            + 'static,
    {
        self.register(Arc::new(FnHandler::new(name, func)));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Asks every handler for its contribution to a node of `node_type`.
    ///
    /// The first handler error stops the dispatch and is returned.
    pub async fn dispatch(
        &self,
        request: RequestId,
        node_type: &str,
        embed: Option<&EmbedNode>,
    ) -> ServiceResult<Dispatch> {
        let mut dispatch = Dispatch::default();
        for handler in &self.handlers {
            let outcome = handler
                .node_context(request, node_type, embed)
                .await
                .map_err(|e| {
                    warn!(%request, handler = handler.name(), node_type, error = %e, "node context handler failed");
                    ServiceError::Extension {
                        handler: handler.name().to_string(),
                        reason: format!("{e:#}"),
                    }
                })?;
            match outcome {
                HandlerOutcome::Handled(context) => {
                    debug!(%request, handler = handler.name(), node_type, "handler contributed context");
                    dispatch.context.merge(context);
                    dispatch.handled.push(handler.name().to_string());
                }
                HandlerOutcome::Declined => {}
            }
        }
        Ok(dispatch)
    }
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}
