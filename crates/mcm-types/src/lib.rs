//! Shared type definitions for mcm.
//!
//! Lightweight value types shared by the tunnel engine, the credential store
//! and the CLI. Nothing in here performs I/O.

pub mod credential;
pub mod endpoint;

pub use credential::{Credential, Credentials, KeySource, TunnelConfig};
pub use endpoint::{Endpoint, LOOPBACK_HOST};
