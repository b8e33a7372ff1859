use std::fmt;

use serde::{Deserialize, Serialize};

/// Loopback address every tunnel listener binds to.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// A host/port pair.
///
/// Port `0` is the "any ephemeral port" sentinel; it only makes sense for bind
/// requests and is resolved by the OS once the socket is bound.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// `127.0.0.1:0`, the local side of every tunnel.
    pub fn loopback_ephemeral() -> Self {
        Self::new(LOOPBACK_HOST, 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_ephemeral(&self) -> bool {
        self.port == 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_host_colon_port() {
        assert_eq!(Endpoint::new("bastion", 22).to_string(), "bastion:22");
        assert_eq!(Endpoint::new("db.internal", 3306).to_string(), "db.internal:3306");
    }

    #[test]
    fn loopback_ephemeral_uses_port_zero() {
        let local = Endpoint::loopback_ephemeral();
        assert_eq!(local.host(), "127.0.0.1");
        assert!(local.is_ephemeral());
        assert_eq!(local.to_string(), "127.0.0.1:0");
    }
}
