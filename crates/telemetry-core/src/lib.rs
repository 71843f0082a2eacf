//! # telemetry-core
//!
//! The transport-free half of the PROTO 1.0 telemetry client: everything
//! needed to turn bytes from the server into typed events, and operator
//! intents into bytes for the server.
//!
//! It has no sockets and no async runtime; the `telemetry-client` crate
//! drives it from a TCP read loop.
//!
//! # How a server line becomes an event (for beginners)
//!
//! ```text
//! socket bytes ──> LineFramer ──> "ROLE ADMIN" ──> decode_line(line, session)
//!                                                      │
//!                                  (ProtocolEvent::RoleAssigned("ADMIN"), session')
//! ```
//!
//! - **`protocol::framer`** splits the byte stream on `\n`, keeping any
//!   partial line for the next read.
//! - **`protocol::decoder`** classifies each line by its literal prefix.
//!   It is a pure function: the [`Session`] (current role and whether a
//!   `USERS` listing is open) goes in and comes back out with the event.
//! - **`protocol::commands`** builds `HELLO`, `AUTH`, `CMD`, `USERS`, `BYE`
//!   and raw lines, terminated with `\r\n`.
//! - **`protocol::records`** offers structured views of `USER`, `ERROR` and
//!   reply payloads for consumers that want them.

pub mod protocol;

pub use protocol::{
    decode_line, Command, CommandError, Decoder, LineFramer, ProtocolEvent, Session,
    TelemetryFields, VehicleCommand,
};
