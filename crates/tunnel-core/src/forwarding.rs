//! Transport seams and the byte forwarder.
//!
//! [`TransportConnector`] and [`Transport`] abstract the SSH connection so the
//! tunnel session can be driven by the real `russh` client or by test doubles.
//! [`spawn_forwarder`] relays one accepted local connection over one channel.

mod forwarder;
mod traits;

pub use forwarder::{Forwarder, RelayStats, spawn_forwarder};
pub use traits::{ForwardStream, ForwardStreamIo, Transport, TransportConnector};
