//! Stored database credentials and the endpoints derived from them.
//!
//! Field names follow the on-disk store format, which predates this crate.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::endpoint::Endpoint;

/// Default database client program.
pub const DEFAULT_DB_COMMAND: &str = "mysql";

/// Default SSH port of the intermediate host.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// The whole credential store document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl Credentials {
    pub fn find(&self, alias: &str) -> Option<&Credential> {
        self.credentials.iter().find(|cred| cred.alias == alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.credentials.iter().map(|cred| cred.alias.as_str())
    }
}

/// One database connection profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    pub alias: String,
    /// Database client program to launch.
    #[serde(rename = "cmd", default = "default_db_command")]
    pub command: String,
    pub host: String,
    /// Database port; `0` leaves the choice to the client program.
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(rename = "pass", default, serialize_with = "expose")]
    pub password: SecretString,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_schema: String,
    /// SSH hop used to reach `host`; absent means a direct connection.
    #[serde(default, alias = "tunel_config", skip_serializing_if = "Option::is_none")]
    pub tunnel_config: Option<TunnelConfig>,
}

fn default_db_command() -> String {
    DEFAULT_DB_COMMAND.to_string()
}

impl Credential {
    /// Where the tunnel listener binds: always loopback, ephemeral port.
    pub fn local_endpoint(&self) -> Endpoint {
        Endpoint::loopback_ephemeral()
    }

    /// The intermediate SSH host, if this credential is tunneled.
    pub fn ssh_endpoint(&self) -> Option<Endpoint> {
        self.tunnel_config.as_ref().map(TunnelConfig::endpoint)
    }

    /// The database as seen from the intermediate host.
    pub fn db_endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Key material used to authenticate against the intermediate host.
    pub fn key_source(&self) -> Option<KeySource> {
        self.tunnel_config.as_ref().map(TunnelConfig::key_source)
    }

    pub fn is_tunneled(&self) -> bool {
        self.tunnel_config.is_some()
    }
}

/// SSH hop settings of a credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub user: String,
    /// Private key path; a leading `~` is expanded to the home directory.
    pub key: String,
    /// Passphrase protecting `key`.
    #[serde(default, alias = "pass", skip_serializing_if = "Option::is_none", serialize_with = "expose_opt")]
    pub passphrase: Option<SecretString>,
    /// Keepalive probe interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_interval: Option<u64>,
    /// Bound on the SSH dial in seconds. Unset means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

// Secrets are written back as plain strings; the store file is the source of truth.
fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn expose_opt<S: Serializer>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

impl TunnelConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn key_source(&self) -> KeySource {
        KeySource {
            path: PathBuf::from(&self.key),
            passphrase: self
                .passphrase
                .clone()
                .filter(|pass| !pass.expose_secret().is_empty()),
        }
    }
}

/// Private key location plus optional passphrase.
#[derive(Clone, Debug)]
pub struct KeySource {
    pub path: PathBuf,
    pub passphrase: Option<SecretString>,
}

impl KeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
