use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by dial errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while establishing or running a tunnel session
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The local listening socket could not be acquired
    #[error("failed to bind local listener {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The private key file could not be read
    #[error("cannot read SSH private key {}: {source}", path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The private key material could not be parsed or decrypted
    #[error("cannot parse SSH private key {}: {source}", path.display())]
    KeyParse {
        path: PathBuf,
        #[source]
        source: KeyDecodeError,
    },

    /// The intermediate host could not be reached or refused authentication
    #[error("SSH dial to {address} failed: {source}")]
    TransportDial {
        address: String,
        #[source]
        source: BoxError,
    },

    /// The intermediate host could not open a channel to the target
    #[error("remote dial to {target} failed: {source}")]
    RemoteDial {
        target: String,
        #[source]
        source: BoxError,
    },

    /// SSH protocol error on an established transport
    #[error("SSH protocol error: {0}")]
    Ssh(#[from] russh::Error),

    /// Accepting on the local listener failed
    #[error("local listener accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Copying one direction of a relay failed
    #[error("relay copy {direction} failed: {source}")]
    StreamCopy {
        direction: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The session task ended without reporting an outcome
    #[error("tunnel session ended unexpectedly")]
    SessionClosed,
}

/// Why a private key could not be decoded
#[derive(Error, Debug)]
pub enum KeyDecodeError {
    #[error("key file is not valid UTF-8")]
    NotUtf8,

    #[error("key is encrypted and no passphrase is configured")]
    PassphraseRequired,

    #[error("incorrect passphrase for encrypted key")]
    WrongPassphrase,

    #[error("unsupported PEM cipher {0}")]
    UnsupportedCipher(String),

    #[error("malformed PEM: {0}")]
    MalformedPem(&'static str),

    #[error("invalid base64 in PEM body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid PKCS#1 RSA key: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    #[error("cannot re-encode RSA key as PKCS#8: {0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    #[error("cannot load re-encoded RSA key: {0}")]
    Import(#[source] russh::keys::Error),

    #[error("not an OpenSSH, PKCS#8 or PEM private key")]
    Unrecognized,
}

/// Result type alias for tunnel operations
pub type TunnelResult<T> = Result<T, TunnelError>;

impl TunnelError {
    pub fn transport_dial(address: impl ToString, source: impl Into<BoxError>) -> Self {
        Self::TransportDial {
            address: address.to_string(),
            source: source.into(),
        }
    }

    pub fn remote_dial(target: impl ToString, source: impl Into<BoxError>) -> Self {
        Self::RemoteDial {
            target: target.to_string(),
            source: source.into(),
        }
    }

    pub fn key_parse(path: impl Into<PathBuf>, source: KeyDecodeError) -> Self {
        Self::KeyParse {
            path: path.into(),
            source,
        }
    }

    /// Which phase of the tunnel lifecycle produced this error.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::KeyRead { .. } | Self::KeyParse { .. } => "key material",
            Self::TransportDial { .. } => "transport dial",
            Self::RemoteDial { .. } => "remote dial",
            Self::Ssh(_) => "transport",
            Self::Accept(_) => "accept",
            Self::StreamCopy { .. } => "relay",
            Self::SessionClosed => "session",
        }
    }
}
