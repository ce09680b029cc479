//! Session pool.
//!
//! Keeps idle info and data handles in two bounded lock-free queues so that
//! requests can reuse connections instead of dialing the daemons each time.
//! Acquiring never blocks: a miss dials a fresh handle, and releasing into a
//! full queue closes the handle. Broken handles and handles whose connection
//! failed are closed instead of cached.

use crate::client::NodeClient;
use crate::config::ServiceConfig;
use crate::error::ServiceResult;
use crate::info::InfoClient;
use crate::transport::Connector;
use canopy_model::FieldRegistry;
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;
use tracing::{debug, warn};

struct PoolShared {
    info_path: String,
    info: ArrayQueue<InfoClient>,
    data: ArrayQueue<NodeClient>,
    connector: Arc<dyn Connector>,
    fields: Arc<FieldRegistry>,
}

/// Cache of idle service handles. Cheap to clone; clones share the queues.
#[derive(Clone)]
pub struct SessionPool {
    shared: Arc<PoolShared>,
}

impl SessionPool {
    /// Creates a pool caching up to `size` idle handles per service.
    ///
    /// A size of zero is treated as one.
    pub fn new(
        size: usize,
        info_path: impl Into<String>,
        connector: Arc<dyn Connector>,
        fields: Arc<FieldRegistry>,
    ) -> Self {
        let size = size.max(1);
        Self {
            shared: Arc::new(PoolShared {
                info_path: info_path.into(),
                info: ArrayQueue::new(size),
                data: ArrayQueue::new(size),
                connector,
                fields,
            }),
        }
    }

    pub fn from_config(
        config: &ServiceConfig,
        connector: Arc<dyn Connector>,
        fields: Arc<FieldRegistry>,
    ) -> Self {
        Self::new(config.pool_size, config.info_path.clone(), connector, fields)
    }

    /// Capacity of each idle queue.
    pub fn size(&self) -> usize {
        self.shared.info.capacity()
    }

    pub fn info_path(&self) -> &str {
        &self.shared.info_path
    }

    /// Number of idle info handles.
    pub fn idle_info(&self) -> usize {
        self.shared.info.len()
    }

    /// Number of idle data handles.
    pub fn idle_data(&self) -> usize {
        self.shared.data.len()
    }

    /// Returns a session holding an info handle, reusing an idle one if any.
    pub async fn session(&self) -> ServiceResult<Session> {
        let info = match self.shared.info.pop() {
            Some(info) => info,
            None => {
                debug!(info_path = %self.shared.info_path, "no idle info handle, dialing");
                InfoClient::connect(
                    Arc::clone(&self.shared.connector),
                    &self.shared.info_path,
                    Arc::clone(&self.shared.fields),
                )
                .await?
            }
        };
        Ok(Session {
            pool: self.clone(),
            info: Some(info),
            data: None,
        })
    }

    /// Returns the session's handles to the pool.
    ///
    /// Dropping the session has the same effect.
    pub fn free(&self, session: Session) {
        drop(session);
    }

    fn release_info(&self, info: InfoClient) {
        if !info.is_reusable() {
            debug!(handle = %info.id(), "discarding dead info handle");
            return;
        }
        if let Err(info) = self.shared.info.push(info) {
            debug!(handle = %info.id(), "info pool full, closing handle");
        }
    }

    fn release_data(&self, data: NodeClient) {
        if !data.is_reusable() {
            debug!(handle = %data.id(), broken = data.is_broken(), "discarding dead data handle");
            return;
        }
        if let Err(data) = self.shared.data.push(data) {
            debug!(handle = %data.id(), "data pool full, closing handle");
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("info_path", &self.shared.info_path)
            .field("size", &self.size())
            .field("idle_info", &self.idle_info())
            .field("idle_data", &self.idle_data())
            .finish()
    }
}

/// Handles to the services, exclusively owned for the duration of a request.
pub struct Session {
    pool: SessionPool,
    info: Option<InfoClient>,
    data: Option<NodeClient>,
}

impl Session {
    pub fn info(&self) -> &InfoClient {
        self.info
            .as_ref()
            .expect("info handle is held until the session is released")
    }

    /// The data client, located on first use.
    ///
    /// If the data service cannot be located the session caches a broken
    /// client carrying the error; see [`NodeClient::broken`].
    pub async fn data(&mut self) -> &NodeClient {
        let client = match self.data.take() {
            Some(client) => client,
            None => match self.pool.shared.data.pop() {
                Some(client) => client,
                None => self.locate_data().await,
            },
        };
        self.data.insert(client)
    }

    async fn locate_data(&self) -> NodeClient {
        match self.info().find_data_service().await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "could not locate data service");
                NodeClient::broken(e, Arc::clone(&self.pool.shared.fields))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.release_data(data);
        }
        if let Some(info) = self.info.take() {
            self.pool.release_info(info);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("info", &self.info)
            .field("data", &self.data)
            .finish()
    }
}
