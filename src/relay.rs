//! the boundary to relay client libraries
//!
//! the websocket protocol itself lives behind these traits. the gateway only needs
//! to open a connection, run a filter to completion (EOSE) and push an event.

use crate::{Event, Filter};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("relay connection error: {0}")]
    Websocket(String),

    #[error("timed out connecting")]
    Timeout,
}

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("subscription closed: {0}")]
    Closed(String),

    #[error("internal channel error, relay connection might have closed")]
    Channel,

    #[error("timed out waiting for EOSE")]
    Timeout,

    #[error("failed to connect: {0}")]
    Connect(#[from] ConnectError),
}

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("ok=false, relay message: {0}")]
    NotOK(String),

    #[error("internal channel error, relay connection might have closed")]
    Channel,

    #[error("timed out waiting for OK")]
    Timeout,

    #[error("failed to connect: {0}")]
    Connect(#[from] ConnectError),
}

/// connection state of a single endpoint as seen by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// never tried. an endpoint that was dropped after an error stays `Failed`
    /// until the next attempt, it does not go back to this
    Unconnected,
    Connecting,
    Connected,
    Failed,
}

/// opens connections, one per relay url
#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Arc<dyn RelayConnection>, ConnectError>;
}

/// a live connection to one relay
#[async_trait]
pub trait RelayConnection: Send + Sync {
    fn url(&self) -> &Url;

    /// stored events matching `filter`, collected until EOSE
    async fn query(&self, filter: &Filter) -> Result<Vec<Event>, QueryError>;

    /// send an event and wait for the relay's OK
    async fn publish(&self, event: &Event) -> Result<(), PublishError>;
}

/// outcome of publishing to one relay
#[derive(Debug)]
pub struct PublishResult {
    pub error: Option<String>,
    pub relay_url: String,
}
