//! Embercast Node -- library crate for the Chromecast-compatible bridge.
//!
//! Re-exports the internal modules so integration tests can boot the full
//! bridge in-process.

pub mod bridge;
pub mod cast_transport;
pub mod config;
pub mod namespaces;
pub mod session;
