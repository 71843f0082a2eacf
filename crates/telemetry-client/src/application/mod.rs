//! Application layer for the operator console.
//!
//! - **`goodbye`** – the graceful shutdown policy (`BYE`, grace delay,
//!   disconnect), written against the [`goodbye::OperatorLink`] trait so it
//!   can be tested without a socket.
//!
//! - **`console_view`** – folds engine events into the operator's view:
//!   latest telemetry, role, connection label, user listing, and one tagged
//!   log line per event.
//!
//! - **`console_input`** – turns typed operator lines into commands or
//!   console actions.

pub mod console_input;
pub mod console_view;
pub mod goodbye;
