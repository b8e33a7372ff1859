use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;
use tunnel_core::TunnelError;

/// Errors that can occur in client-core operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// No credential with this alias in the store
    #[error("credential {0:?} not found")]
    NotFound(String),

    /// The credential store could not be read, created or located
    #[error("credential store {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential store is not valid TOML for the expected layout
    #[error("failed to parse credential store {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An empty store could not be serialized
    #[error("failed to encode credential store: {0}")]
    Encode(#[from] toml::ser::Error),

    /// The tunnel failed in one of its phases
    #[error("tunnel {phase} failed: {0}", phase = .0.phase())]
    Tunnel(#[from] TunnelError),

    /// The database client or editor could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The launched program ran but exited unsuccessfully
    #[error("{program} exited with {status}")]
    ClientExited { program: String, status: ExitStatus },

    /// A tunnel was requested for a credential without tunnel settings
    #[error("credential {0:?} has no tunnel_config")]
    MissingTunnel(String),
}

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }
}
