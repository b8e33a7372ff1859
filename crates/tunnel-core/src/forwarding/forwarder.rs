use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};
use tracing::{trace, warn};

use crate::TunnelError;

/// Bytes moved by a finished forwarder; `None` for a direction that failed or was aborted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub to_remote: Option<u64>,
    pub to_local: Option<u64>,
}

/// The two copy tasks relaying one local connection over one channel.
///
/// Dropping a `Forwarder` detaches the tasks; the owning session aborts them on teardown.
pub struct Forwarder {
    to_remote: JoinHandle<Option<u64>>,
    to_local: JoinHandle<Option<u64>>,
}

impl Forwarder {
    pub fn is_finished(&self) -> bool {
        self.to_remote.is_finished() && self.to_local.is_finished()
    }

    pub fn abort(&self) {
        self.to_remote.abort();
        self.to_local.abort();
    }

    /// Wait for both directions to end.
    pub async fn join(self) -> RelayStats {
        RelayStats {
            to_remote: self.to_remote.await.ok().flatten(),
            to_local: self.to_local.await.ok().flatten(),
        }
    }
}

/// Start relaying between `local` and `remote`.
///
/// Each direction runs in its own task and copies until its source reaches EOF
/// or fails, then shuts down the opposite write half. A failing direction is
/// logged and leaves the other one running.
pub fn spawn_forwarder<L, R>(local: L, remote: R) -> Forwarder
where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    let (local_read, local_write) = tokio::io::split(local);
    let (remote_read, remote_write) = tokio::io::split(remote);
    Forwarder {
        to_remote: tokio::spawn(copy_direction("local->remote", local_read, remote_write)),
        to_local: tokio::spawn(copy_direction("remote->local", remote_read, local_write)),
    }
}

async fn copy_direction<Rd, Wr>(direction: &'static str, mut reader: Rd, mut writer: Wr) -> Option<u64>
where
    Rd: AsyncRead + Unpin,
    Wr: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(&mut reader, &mut writer).await;
    let _ = writer.shutdown().await;
    match copied {
        Ok(bytes) => {
            trace!(direction, bytes, "relay direction reached EOF");
            Some(bytes)
        }
        Err(source) => {
            let err = TunnelError::StreamCopy { direction, source };
            warn!(%err, "relay direction stopped");
            None
        }
    }
}

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;
