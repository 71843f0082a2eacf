//! telemetry-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does telemetry-client do? (for beginners)
//!
//! It is the operator's side of a PROTO 1.0 session with a vehicle
//! telemetry server:
//!
//! 1. Opens a TCP connection to the server (bounded connect timeout).
//! 2. Runs a read loop in its own tokio task that frames the byte stream
//!    into lines, decodes each line with `telemetry_core`, and delivers the
//!    resulting [`ClientEvent`]s on a channel.
//! 3. Sends operator commands (`HELLO`, `AUTH`, `CMD ...`, `USERS`, `BYE`,
//!    or raw text) with one writer at a time, independently of the reads.
//! 4. Closes cooperatively: the read loop notices and exits on its own.

/// Application layer: caller-level policies and the console view.
pub mod application;

/// Infrastructure layer: network connection manager and configuration.
pub mod infrastructure;

pub use infrastructure::network::{
    ClientConnectionConfig, ClientEvent, CloseReason, ConnectError, ConnectionInfo,
    ConnectionStatus, SendError, TelemetryClient,
};
