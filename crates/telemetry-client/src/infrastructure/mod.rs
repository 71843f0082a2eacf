//! Infrastructure layer for the telemetry client.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `telemetry_core`, but MUST NOT be imported by `telemetry_core`.
//!
//! # Sub-modules
//!
//! - **`network`** – the connection manager: TCP connect with a bounded
//!   timeout, the per-connection read loop, serialised writes, and
//!   cooperative disconnect.
//!
//! - **`storage`** – TOML configuration for the console.

pub mod network;
pub mod storage;
