//! Client side of the Canopy node daemons.
//!
//! The front-end never touches content storage directly. It talks to two
//! daemons over RPC:
//! - the **info** daemon, which knows where the other services listen
//! - the **data** daemon, which stores node documents, blobs, schemas and
//!   site configuration
//!
//! ## Components
//!
//! - **Protocol / Framing**: request and response messages, length-prefixed JSON
//! - **Transport**: the [`RpcTransport`] and [`Connector`] seams, with a
//!   stream implementation and an in-memory [`transport::mock`]
//! - **Codec**: converts a [`canopy_model::Node`] to and from its wire document
//! - **Client**: [`NodeClient`] for the data daemon, [`InfoClient`] for the info daemon
//! - **Pool**: [`SessionPool`] caches idle handles between requests
//! - **Signals**: [`SignalRegistry`] lets plugins contribute render context
//! - **Resolver**: [`NodeResolver`] ties a session and the signals together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use canopy_model::FieldRegistry;
//! use canopy_service::{ServiceConfig, SessionPool, UnixConnector};
//!
//! # async fn run() -> canopy_service::ServiceResult<()> {
//! let config = ServiceConfig::from_file("/etc/canopy/service.toml")?;
//! let connector = Arc::new(UnixConnector::new(config.call_timeout()));
//! let pool = SessionPool::from_config(&config, connector, Arc::new(FieldRegistry::new()));
//!
//! let mut session = pool.session().await?;
//! if let Some(node) = session.data().await.get_node("example", "/about").await? {
//!     println!("{} is a {}", node.path, node.type_id());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod codec;
mod config;
mod error;
pub mod framing;
mod info;
mod pool;
pub mod protocol;
mod resolver;
pub mod signals;
pub mod transport;

pub use client::NodeClient;
pub use codec::{EncodeMode, NodeDocument, SchemaLookup, decode_node, encode_node};
pub use config::{DEFAULT_POOL_SIZE, ServiceConfig, SiteConfig};
pub use error::{ServiceError, ServiceResult};
pub use info::InfoClient;
pub use pool::{Session, SessionPool};
pub use protocol::{NODE_FILE, ServiceRequest, ServiceResponse};
pub use resolver::{NodeResolver, ResolvedNode};
pub use signals::{
    CacheDep, CacheMods, Dispatch, FnHandler, HandlerOutcome, NodeContext, NodeContextHandler,
    SignalRegistry,
};
#[cfg(unix)]
pub use transport::UnixConnector;
pub use transport::{Connector, RpcTransport, StreamTransport};
