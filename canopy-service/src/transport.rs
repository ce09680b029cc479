//! Transport layer abstraction.
//!
//! [`RpcTransport`] is the request/response primitive every client sits on.
//! [`Connector`] turns an address into a transport; the session pool uses it
//! to dial fresh handles on a cache miss.

use crate::error::{ServiceError, ServiceResult};
use crate::framing::{read_frame, write_frame};
use crate::protocol::{ServiceRequest, ServiceResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub mod mock;

/// A reliable request/response channel to one daemon.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Sends a request and waits for its response.
    async fn call(&self, request: ServiceRequest) -> ServiceResult<ServiceResponse>;

    /// Whether further calls can succeed. Unhealthy transports are not reused.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Dials daemons by address.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &str) -> ServiceResult<Arc<dyn RpcTransport>>;
}

/// Framed RPC over a byte stream, one call in flight at a time.
///
/// A call that fails mid-exchange leaves the stream in an unknown position,
/// so the transport refuses further calls after any I/O error or timeout.
pub struct StreamTransport<S> {
    stream: Mutex<S>,
    timeout: Option<Duration>,
    poisoned: AtomicBool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(stream),
            timeout: None,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Bounds every call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    async fn exchange(&self, request: &ServiceRequest) -> ServiceResult<ServiceResponse> {
        let mut stream = self.stream.lock().await;
        write_frame(&mut *stream, request).await?;
        Ok(read_frame(&mut *stream).await?)
    }
}

#[async_trait]
impl<S> RpcTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn call(&self, request: ServiceRequest) -> ServiceResult<ServiceResponse> {
        if self.is_poisoned() {
            return Err(ServiceError::Transport("connection is broken".into()));
        }
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(&request))
                .await
                .unwrap_or_else(|_| Err(ServiceError::Timeout(limit))),
            None => self.exchange(&request).await,
        };
        if let Err(e) = &result {
            warn!(method = request.method(), error = %e, "RPC call failed, closing connection");
            self.poisoned.store(true, Ordering::Release);
        }
        result.map_err(|e| e.context(request.method()))
    }

    fn is_healthy(&self) -> bool {
        !self.is_poisoned()
    }
}

/// Dials daemons listening on unix domain sockets.
#[cfg(unix)]
#[derive(Debug, Clone, Default)]
pub struct UnixConnector {
    timeout: Option<Duration>,
}

#[cfg(unix)]
impl UnixConnector {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[cfg(unix)]
#[async_trait]
impl Connector for UnixConnector {
    async fn connect(&self, address: &str) -> ServiceResult<Arc<dyn RpcTransport>> {
        let stream = tokio::net::UnixStream::connect(address)
            .await
            .map_err(|e| ServiceError::Transport(format!("could not dial {address}: {e}")))?;
        debug!(address, "dialed service");
        Ok(Arc::new(
            StreamTransport::new(stream).with_timeout(self.timeout),
        ))
    }
}
