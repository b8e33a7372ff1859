use std::net::SocketAddr;

use async_trait::async_trait;
use mcm_types::Endpoint;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::TunnelResult;

/// Trait for streams that can be used for forwarding.
pub trait ForwardStreamIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ForwardStreamIo for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Type alias for boxed forward streams.
pub type ForwardStream = Box<dyn ForwardStreamIo>;

/// Dials the authenticated transport connection to the intermediate host.
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    type Transport: Transport;

    /// Connect and authenticate. Every failure is a `TransportDial` error.
    async fn connect(&self, endpoint: &Endpoint) -> TunnelResult<Self::Transport>;
}

/// An established transport able to open channels to further endpoints.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a channel to `target` on behalf of the local peer `origin`.
    async fn open_channel(&self, target: &Endpoint, origin: SocketAddr) -> TunnelResult<ForwardStream>;

    /// Close the connection and every channel still open on it.
    async fn close(&self) -> TunnelResult<()>;
}
