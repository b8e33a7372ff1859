//! Connect orchestration for mcm: credential store, database client launch
//! and the SSH tunnel around it.

pub mod error;
pub mod launcher;
pub mod store;

use std::{path::Path, time::Duration};

pub use error::{ClientError, ClientResult};
use launcher::{direct_command, editor_command, run_foreground, tunnel_command};
use mcm_types::Credential;
pub use store::{CredentialStore, default_credentials_path};
use tracing::info;
use tunnel_core::{SshAuthenticator, SshConnector, TransportOptions, TunnelPlan, TunnelSession};

/// Start the tunnel for a credential and return it once it is ready.
///
/// The private key is loaded first, so key problems surface before any
/// listener is bound.
pub async fn open_tunnel(cred: &Credential) -> ClientResult<TunnelSession> {
    let (Some(tunnel), Some(transport), Some(key_source)) = (cred.tunnel_config.as_ref(), cred.ssh_endpoint(), cred.key_source())
    else {
        return Err(ClientError::MissingTunnel(cred.alias.clone()));
    };
    let authenticator = SshAuthenticator::from_key_source(&tunnel.user, &key_source).await?;
    let options = TransportOptions {
        keepalive_interval: tunnel.keepalive_interval.map(Duration::from_secs),
        connect_timeout: tunnel.connect_timeout.map(Duration::from_secs),
    };
    let plan = TunnelPlan {
        local: cred.local_endpoint(),
        transport,
        target: cred.db_endpoint(),
    };
    let session = TunnelSession::open(plan, SshConnector::new(authenticator, options)).await?;
    info!(alias = %cred.alias, port = session.local_port(), "tunnel ready");
    Ok(session)
}

/// Launch the database client for `cred`, through a tunnel when it has one.
pub async fn connect(cred: &Credential) -> ClientResult<()> {
    if !cred.is_tunneled() {
        info!(alias = %cred.alias, db = %cred.db_endpoint(), "connecting directly");
        return run_foreground(direct_command(cred)).await;
    }
    let session = open_tunnel(cred).await?;
    let command = tunnel_command(cred, session.local_port());
    session.run(run_foreground(command)).await?
}

/// Load the store at `path` and connect to `alias`.
pub async fn connect_alias(path: &Path, alias: &str) -> ClientResult<()> {
    let store = CredentialStore::load_or_create(path)?;
    connect(store.get(alias)?).await
}

/// Aliases of the store at `path`, creating an empty store if needed.
pub fn list_aliases(path: &Path) -> ClientResult<Vec<String>> {
    Ok(CredentialStore::load_or_create(path)?.aliases())
}

/// Open the store at `path` in `$EDITOR`.
pub async fn edit_credentials(path: &Path) -> ClientResult<()> {
    run_foreground(editor_command(path)).await
}
