//! Tunnel forwarding engine.
//!
//! A [`TunnelSession`] binds a loopback listener, announces its port, lazily
//! dials one SSH transport on the first accepted connection and relays every
//! accepted connection to the target endpoint over its own channel.

pub mod error;
pub mod forwarding;
pub mod keys;
pub mod launch;
pub mod session;
pub mod transport;

pub use error::{KeyDecodeError, TunnelError, TunnelResult};
pub use session::{SessionState, TunnelPlan, TunnelSession};
pub use transport::{SshAuthenticator, SshConnector, TransportOptions};
