//! Persistent settings for the telemetry console.

pub mod config;
