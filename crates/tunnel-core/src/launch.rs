//! Readiness signalling between the accept task and the caller that launches
//! the database client.
//!
//! The accept task reports [`SessionEvent::Ready`] once, after binding and
//! before its first `accept`, and [`SessionEvent::Failed`] at most once when
//! the session dies. The caller must not start the client before `Ready`, and
//! must not hang if the session fails first.

use tokio::sync::mpsc;
use tracing::debug;

use crate::{TunnelError, TunnelResult};

/// Outcome reported by the accept task.
#[derive(Debug)]
pub enum SessionEvent {
    Ready { port: u16 },
    Failed(TunnelError),
}

/// Create a connected signal pair.
pub fn readiness_channel() -> (ReadySignal, Readiness) {
    // Ready and Failed are the only two messages ever sent.
    let (tx, rx) = mpsc::channel(2);
    (ReadySignal { tx, announced: false }, Readiness { rx })
}

/// Sending half, owned by the accept task.
pub struct ReadySignal {
    tx: mpsc::Sender<SessionEvent>,
    announced: bool,
}

impl ReadySignal {
    /// Announce the bound port. Later calls are ignored.
    pub async fn ready(&mut self, port: u16) {
        if self.announced {
            return;
        }
        self.announced = true;
        if self.tx.send(SessionEvent::Ready { port }).await.is_err() {
            debug!(port, "nobody is waiting for tunnel readiness");
        }
    }

    /// Report the terminal error of the session.
    pub async fn failed(self, err: TunnelError) {
        if let Err(mpsc::error::SendError(SessionEvent::Failed(err))) = self.tx.send(SessionEvent::Failed(err)).await {
            debug!(%err, "tunnel failure reported after the caller went away");
        }
    }
}

/// Receiving half, owned by the caller.
pub struct Readiness {
    rx: mpsc::Receiver<SessionEvent>,
}

impl Readiness {
    /// Block until the listener is ready (returns its port) or the session failed.
    pub async fn wait_ready(&mut self) -> TunnelResult<u16> {
        match self.rx.recv().await {
            Some(SessionEvent::Ready { port }) => Ok(port),
            Some(SessionEvent::Failed(err)) => Err(err),
            None => Err(TunnelError::SessionClosed),
        }
    }

    /// Block until the session reports its terminal error.
    ///
    /// Resolves with `SessionClosed` if the session ended without one, and
    /// never resolves with a late `Ready`.
    pub async fn wait_failed(&mut self) -> TunnelError {
        loop {
            match self.rx.recv().await {
                Some(SessionEvent::Ready { .. }) => continue,
                Some(SessionEvent::Failed(err)) => return err,
                None => return TunnelError::SessionClosed,
            }
        }
    }
}
