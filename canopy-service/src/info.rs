//! Client for the info daemon, which knows where the other services live.

use crate::client::NodeClient;
use crate::error::{ServiceError, ServiceResult};
use crate::protocol::ServiceRequest;
use crate::transport::{Connector, RpcTransport};
use canopy_model::FieldRegistry;
use canopy_types::HandleId;
use std::sync::Arc;
use tracing::{debug, info};

/// A handle to the info daemon.
pub struct InfoClient {
    id: HandleId,
    transport: Arc<dyn RpcTransport>,
    connector: Arc<dyn Connector>,
    fields: Arc<FieldRegistry>,
}

impl InfoClient {
    /// Dials the info daemon at `info_path`.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        info_path: &str,
        fields: Arc<FieldRegistry>,
    ) -> ServiceResult<Self> {
        let transport = connector
            .connect(info_path)
            .await
            .map_err(|e| e.context("could not connect to info service"))?;
        let id = HandleId::new();
        debug!(handle = %id, info_path, "connected to info service");
        Ok(Self {
            id,
            transport,
            connector,
            fields,
        })
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Whether the handle may be cached for another session.
    pub fn is_reusable(&self) -> bool {
        self.transport.is_healthy()
    }

    /// Asks the info daemon for the data service and dials it.
    pub async fn find_data_service(&self) -> ServiceResult<NodeClient> {
        let address = self
            .transport
            .call(ServiceRequest::FindDataService)
            .await
            .and_then(|reply| reply.into_address())
            .map_err(|e| e.context("could not find data service"))?;
        if address.is_empty() {
            return Err(ServiceError::Transport(
                "info service knows no data service".into(),
            ));
        }
        let transport = self
            .connector
            .connect(&address)
            .await
            .map_err(|e| e.context("could not connect to data service"))?;
        let client = NodeClient::new(transport, Arc::clone(&self.fields));
        info!(handle = %client.id(), %address, "connected to data service");
        Ok(client)
    }
}

impl std::fmt::Debug for InfoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoClient").field("id", &self.id).finish()
    }
}
