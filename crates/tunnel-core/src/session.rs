//! The tunnel session: one local listener, at most one transport connection,
//! and the accept loop relaying every local connection through it.

use std::{fmt, future::Future, net::SocketAddr};

use mcm_types::Endpoint;
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    TunnelError,
    TunnelResult,
    forwarding::{Forwarder, Transport, TransportConnector, spawn_forwarder},
    launch::{Readiness, ReadySignal, readiness_channel},
};

/// The three endpoints a tunnel joins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TunnelPlan {
    /// Local bind address, normally `127.0.0.1:0`.
    pub local: Endpoint,
    /// Intermediate SSH host.
    pub transport: Endpoint,
    /// Database endpoint as reachable from the intermediate host.
    pub target: Endpoint,
}

/// Lifecycle of a tunnel session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    TransportPending,
    Forwarding,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::TransportPending => "transport-pending",
            Self::Forwarding => "forwarding",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Handle to a running tunnel.
///
/// The listener lives as long as the handle. [`run`](Self::run) and
/// [`close`](Self::close) release it before returning; dropping the handle
/// releases it in the background.
pub struct TunnelSession {
    local_addr: SocketAddr,
    readiness: Readiness,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TunnelSession {
    /// Bind the local listener, start accepting, and wait until the session is
    /// ready to take the database client.
    ///
    /// The transport is not dialed here; that happens on the first accepted
    /// connection.
    pub async fn open<C>(plan: TunnelPlan, connector: C) -> TunnelResult<Self>
    where
        C: TransportConnector,
    {
        let bind_error = |source| TunnelError::Bind {
            address: plan.local.to_string(),
            source,
        };
        let listener = TcpListener::bind((plan.local.host(), plan.local.port()))
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        info!(
            local = %local_addr,
            transport = %plan.transport,
            target = %plan.target,
            "tunnel listener bound"
        );

        let (signal, readiness) = readiness_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let relay = Relay::new(connector, plan);
        let task = tokio::spawn(relay.run(listener, local_addr.port(), signal, shutdown_rx));

        let mut session = Self {
            local_addr,
            readiness,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        };
        match session.readiness.wait_ready().await {
            Ok(port) => {
                debug!(port, "tunnel ready");
                Ok(session)
            }
            Err(err) => {
                session.teardown().await;
                Err(err)
            }
        }
    }

    /// Port of the bound listener; the database client connects to `127.0.0.1:<port>`.
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Drive `foreground` (typically the launched database client) while the
    /// tunnel serves it.
    ///
    /// Returns the foreground output once it completes, or the session's fatal
    /// error if the tunnel dies first, in which case `foreground` is dropped.
    /// The session is torn down either way.
    pub async fn run<F>(mut self, foreground: F) -> TunnelResult<F::Output>
    where
        F: Future,
    {
        let outcome = tokio::select! {
            output = foreground => Ok(output),
            err = self.readiness.wait_failed() => Err(err),
        };
        self.teardown().await;
        outcome
    }

    /// Wait for the session to fail. Only useful when nothing else drives it.
    pub async fn failed(&mut self) -> TunnelError {
        self.readiness.wait_failed().await
    }

    /// Stop accepting, close the transport and every relay, release the listener.
    pub async fn close(mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(?err, "tunnel accept task ended abnormally");
        }
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// State owned by the accept task.
///
/// `transport` goes from `None` to `Some` at most once and only here, so it
/// needs no lock.
struct Relay<C: TransportConnector> {
    connector: C,
    plan: TunnelPlan,
    transport: Option<C::Transport>,
    forwarders: Vec<Forwarder>,
    state: SessionState,
}

impl<C: TransportConnector> Relay<C> {
    fn new(connector: C, plan: TunnelPlan) -> Self {
        Self {
            connector,
            plan,
            transport: None,
            forwarders: Vec::new(),
            state: SessionState::Idle,
        }
    }

    async fn run(mut self, listener: TcpListener, port: u16, mut signal: ReadySignal, mut shutdown: oneshot::Receiver<()>) {
        self.transition(SessionState::Listening);
        // Ready goes out before the first accept.
        signal.ready(port).await;

        let failure = tokio::select! {
            _ = &mut shutdown => None,
            err = self.serve(&listener) => Some(err),
        };
        drop(listener);
        self.teardown().await;

        match failure {
            Some(err) => {
                self.transition(SessionState::Failed);
                warn!(phase = err.phase(), %err, "tunnel session failed");
                signal.failed(err).await;
            }
            None => self.transition(SessionState::Closed),
        }
    }

    /// Accept until something fatal happens.
    async fn serve(&mut self, listener: &TcpListener) -> TunnelError {
        loop {
            if let Err(err) = self.accept_one(listener).await {
                return err;
            }
        }
    }

    async fn accept_one(&mut self, listener: &TcpListener) -> TunnelResult<()> {
        let (stream, origin) = listener.accept().await.map_err(TunnelError::Accept)?;
        stream.set_nodelay(true).ok();
        debug!(%origin, "accepted local connection");
        self.forwarders.retain(|forwarder| !forwarder.is_finished());

        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => {
                self.transition(SessionState::TransportPending);
                let transport = self.connector.connect(&self.plan.transport).await?;
                info!(transport = %self.plan.transport, "SSH transport established");
                transport
            }
        };
        let transport = self.transport.insert(transport);

        let channel = transport.open_channel(&self.plan.target, origin).await?;
        self.forwarders.push(spawn_forwarder(stream, channel));
        self.transition(SessionState::Forwarding);
        debug!(%origin, target = %self.plan.target, active = self.forwarders.len(), "relay started");
        Ok(())
    }

    async fn teardown(&mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        if let Some(transport) = self.transport.take() {
            if let Err(err) = transport.close().await {
                warn!(%err, "failed to close SSH transport");
            } else {
                debug!(transport = %self.plan.transport, "SSH transport closed");
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "tunnel session state");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_render_in_kebab_case() {
        assert_eq!(SessionState::TransportPending.to_string(), "transport-pending");
        assert_eq!(SessionState::Forwarding.to_string(), "forwarding");
    }

    #[tokio::test]
    async fn bind_failure_is_reported_as_bind_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let plan = TunnelPlan {
            local: Endpoint::new("127.0.0.1", port),
            transport: Endpoint::new("bastion", 22),
            target: Endpoint::new("db", 3306),
        };
        let err = TunnelSession::open(plan, NeverConnects).await.err().unwrap();
        assert_eq!(err.phase(), "bind");
    }

    struct NeverConnects;

    #[async_trait::async_trait]
    impl TransportConnector for NeverConnects {
        type Transport = NoTransport;

        async fn connect(&self, endpoint: &Endpoint) -> TunnelResult<NoTransport> {
            Err(TunnelError::transport_dial(endpoint, "unreachable"))
        }
    }

    struct NoTransport;

    #[async_trait::async_trait]
    impl Transport for NoTransport {
        async fn open_channel(&self, target: &Endpoint, _origin: SocketAddr) -> TunnelResult<crate::forwarding::ForwardStream> {
            Err(TunnelError::remote_dial(target, "unreachable"))
        }

        async fn close(&self) -> TunnelResult<()> {
            Ok(())
        }
    }
}
