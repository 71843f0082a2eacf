//! PROTO 1.0 protocol: framing, decoding, session state, and command encoding.

pub mod commands;
pub mod decoder;
pub mod events;
pub mod framer;
pub mod records;
pub mod session;

pub use commands::{frame_line, Command, CommandError, VehicleCommand, LINE_TERMINATOR};
pub use decoder::{decode_line, parse_data_payload, Decoder};
pub use events::{DecodeAnomaly, ProtocolEvent, TelemetryFields};
pub use framer::{LineFramer, Lines};
pub use session::{Session, DEFAULT_ROLE};
