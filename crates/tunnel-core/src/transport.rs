//! The SSH transport: authentication, dialing, and `direct-tcpip` channels.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use mcm_types::{Endpoint, KeySource};
use russh::{
    Disconnect,
    client::{self, AuthResult},
    keys::{HashAlg, PrivateKey, PrivateKeyWithHashAlg, PublicKey},
};
use tracing::{debug, info, warn};

use crate::{
    TunnelError,
    TunnelResult,
    error::BoxError,
    forwarding::{ForwardStream, Transport, TransportConnector},
    keys::load_private_key,
};

/// Keepalive interval used when the credential does not set one.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// Public-key credentials for the intermediate host.
#[derive(Clone)]
pub struct SshAuthenticator {
    username: String,
    key: Arc<PrivateKey>,
}

impl SshAuthenticator {
    /// Load the key described by `source`. Fails with `KeyRead` or `KeyParse`.
    pub async fn from_key_source(username: impl Into<String>, source: &KeySource) -> TunnelResult<Self> {
        let key = load_private_key(source).await?;
        Ok(Self::new(username, key))
    }

    pub fn new(username: impl Into<String>, key: PrivateKey) -> Self {
        Self {
            username: username.into(),
            key: Arc::new(key),
        }
    }

    async fn authenticate(&self, handle: &mut client::Handle<AcceptAnyHostKey>) -> Result<(), BoxError> {
        let rsa_hash = handle.best_supported_rsa_hash().await.unwrap_or(None).flatten();
        let key = PrivateKeyWithHashAlg::new(self.key.clone(), rsa_hash);
        match handle.authenticate_publickey(self.username.clone(), key).await? {
            AuthResult::Success => {
                info!(user = %self.username, "SSH public key authentication succeeded");
                Ok(())
            }
            AuthResult::Failure { .. } => Err(format!("public key for user {} was rejected", self.username).into()),
        }
    }
}

/// Knobs for the SSH client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub keepalive_interval: Option<Duration>,
    /// Upper bound for TCP connect, handshake and authentication together.
    pub connect_timeout: Option<Duration>,
}

/// Dials the intermediate host with `russh`.
pub struct SshConnector {
    authenticator: SshAuthenticator,
    config: Arc<client::Config>,
    connect_timeout: Option<Duration>,
}

impl SshConnector {
    pub fn new(authenticator: SshAuthenticator, options: TransportOptions) -> Self {
        let config = client::Config {
            nodelay: true,
            inactivity_timeout: None,
            keepalive_interval: options.keepalive_interval.or(Some(DEFAULT_KEEPALIVE)),
            keepalive_max: 3,
            ..Default::default()
        };
        Self {
            authenticator,
            config: Arc::new(config),
            connect_timeout: options.connect_timeout,
        }
    }

    async fn dial(&self, endpoint: &Endpoint) -> TunnelResult<client::Handle<AcceptAnyHostKey>> {
        info!(%endpoint, user = %self.authenticator.username, "connecting to SSH host");
        let handler = AcceptAnyHostKey {
            authority: endpoint.to_string(),
        };
        let mut handle = client::connect(self.config.clone(), (endpoint.host(), endpoint.port()), handler)
            .await
            .map_err(|err| TunnelError::transport_dial(endpoint, err))?;
        self.authenticator
            .authenticate(&mut handle)
            .await
            .map_err(|err| TunnelError::transport_dial(endpoint, err))?;
        Ok(handle)
    }
}

#[async_trait]
impl TransportConnector for SshConnector {
    type Transport = SshTransport;

    async fn connect(&self, endpoint: &Endpoint) -> TunnelResult<SshTransport> {
        let handle = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.dial(endpoint))
                .await
                .map_err(|_| TunnelError::transport_dial(endpoint, format!("timed out after {limit:?}")))??,
            None => self.dial(endpoint).await?,
        };
        Ok(SshTransport {
            handle,
            endpoint: endpoint.clone(),
        })
    }
}

/// Host key policy of the tunnel: every server key is accepted.
///
/// No pinning and no known_hosts lookup happen here. The fingerprint is logged
/// so it can be checked by hand.
// TODO: verify against ~/.ssh/known_hosts before accepting.
pub struct AcceptAnyHostKey {
    authority: String,
}

impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        debug!(
            authority = %self.authority,
            algorithm = %server_public_key.algorithm(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "accepting unverified SSH host key"
        );
        Ok(true)
    }
}

/// An authenticated SSH connection.
pub struct SshTransport {
    handle: client::Handle<AcceptAnyHostKey>,
    endpoint: Endpoint,
}

#[async_trait]
impl Transport for SshTransport {
    async fn open_channel(&self, target: &Endpoint, origin: SocketAddr) -> TunnelResult<ForwardStream> {
        let channel = self
            .handle
            .channel_open_direct_tcpip(
                target.host(),
                u32::from(target.port()),
                origin.ip().to_string(),
                u32::from(origin.port()),
            )
            .await
            .map_err(|err| TunnelError::remote_dial(target, err))?;
        Ok(Box::new(channel.into_stream()))
    }

    async fn close(&self) -> TunnelResult<()> {
        if let Err(err) = self.handle.disconnect(Disconnect::ByApplication, "", "").await {
            warn!(endpoint = %self.endpoint, ?err, "SSH disconnect failed");
            return Err(err.into());
        }
        Ok(())
    }
}
