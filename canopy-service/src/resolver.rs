//! Render-time node resolution: fetch a node, then collect extension context.

use crate::error::ServiceResult;
use crate::pool::Session;
use crate::signals::{NodeContext, SignalRegistry};
use canopy_model::{EmbedNode, Node};
use canopy_types::RequestId;
use std::sync::Arc;
use tracing::debug;

/// A node ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub node: Node,
    /// Merged contributions of every handler that handled the node.
    pub context: NodeContext,
    pub handled_by: Vec<String>,
}

/// Fetches nodes through a session and runs the extension handlers on them.
#[derive(Debug, Clone)]
pub struct NodeResolver {
    signals: Arc<SignalRegistry>,
}

impl NodeResolver {
    pub fn new(signals: Arc<SignalRegistry>) -> Self {
        Self { signals }
    }

    pub fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    /// Resolves the node at `path`. Returns `None` if it does not exist.
    ///
    /// Fails if the data service is unavailable or a handler fails.
    pub async fn resolve(
        &self,
        session: &mut Session,
        site: &str,
        path: &str,
        request: RequestId,
    ) -> ServiceResult<Option<ResolvedNode>> {
        self.resolve_with(session, site, path, request, None).await
    }

    /// Resolves the node an embed descriptor points to.
    ///
    /// Handlers receive the descriptor, so they can honour its query.
    pub async fn resolve_embedded(
        &self,
        session: &mut Session,
        site: &str,
        embed: &EmbedNode,
        request: RequestId,
    ) -> ServiceResult<Option<ResolvedNode>> {
        self.resolve_with(session, site, embed.path(), request, Some(embed))
            .await
    }

    async fn resolve_with(
        &self,
        session: &mut Session,
        site: &str,
        path: &str,
        request: RequestId,
        embed: Option<&EmbedNode>,
    ) -> ServiceResult<Option<ResolvedNode>> {
        let data = session.data().await;
        data.check()?;
        let Some(node) = data.get_node(site, path).await? else {
            debug!(%request, site, path, "node not found");
            return Ok(None);
        };
        let dispatch = self
            .signals
            .dispatch(request, node.type_id(), embed)
            .await?;
        Ok(Some(ResolvedNode {
            node,
            context: dispatch.context,
            handled_by: dispatch.handled,
        }))
    }
}
