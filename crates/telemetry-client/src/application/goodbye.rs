//! Graceful goodbye: the operator-side shutdown policy.
//!
//! The engine only knows how to send a line and how to close.  Leaving
//! politely is a caller decision built on those two operations:
//!
//! ```text
//! connected? ──yes──> send BYE ──> wait grace ──> disconnect
//!     │
//!     no ──────────────────────────────────────> disconnect (no-op)
//! ```
//!
//! The grace delay gives the server a moment to read `BYE` and answer
//! `OK bye` before the socket goes away.

use std::time::Duration;

use async_trait::async_trait;
use telemetry_core::protocol::Command;
use tracing::{debug, warn};

/// Default pause between `BYE` and closing the socket.
pub const DEFAULT_GOODBYE_GRACE: Duration = Duration::from_millis(150);

/// The slice of the connection manager a shutdown policy needs.
///
/// Implemented by the network layer; tests use a recording double.
#[async_trait]
pub trait OperatorLink: Send + Sync {
    /// True while a connection is active.
    async fn is_connected(&self) -> bool;

    /// Encodes and sends a command.
    async fn send_command(&self, command: &Command) -> Result<(), String>;

    /// Closes the active connection, if any.
    async fn disconnect(&self);
}

/// What [`graceful_goodbye`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoodbyeOutcome {
    /// `BYE` was sent before closing.
    SaidBye,
    /// Nothing was connected.
    NotConnected,
    /// `BYE` could not be sent; the connection was closed anyway.
    ByeFailed(String),
}

/// Sends `BYE`, waits `grace`, then disconnects.
///
/// The connection is always closed, even when `BYE` fails to go out.
pub async fn graceful_goodbye<L: OperatorLink + ?Sized>(
    link: &L,
    grace: Duration,
) -> GoodbyeOutcome {
    if !link.is_connected().await {
        link.disconnect().await;
        return GoodbyeOutcome::NotConnected;
    }

    let outcome = match link.send_command(&Command::Bye).await {
        Ok(()) => {
            debug!("BYE sent; waiting {grace:?} before closing");
            tokio::time::sleep(grace).await;
            GoodbyeOutcome::SaidBye
        }
        Err(e) => {
            warn!("could not send BYE: {e}");
            GoodbyeOutcome::ByeFailed(e)
        }
    };
    link.disconnect().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingLink {
        connected: bool,
        should_fail: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OperatorLink for RecordingLink {
        async fn is_connected(&self) -> bool {
            self.connected
        }

        async fn send_command(&self, command: &Command) -> Result<(), String> {
            if self.should_fail {
                return Err("injected failure".to_string());
            }
            let line = command.encode().map_err(|e| e.to_string())?;
            self.calls.lock().unwrap().push(format!("send {line}"));
            Ok(())
        }

        async fn disconnect(&self) {
            self.calls.lock().unwrap().push("disconnect".to_string());
        }
    }

    #[tokio::test]
    async fn test_connected_link_says_bye_then_disconnects() {
        let link = RecordingLink {
            connected: true,
            ..Default::default()
        };

        let outcome = graceful_goodbye(&link, Duration::from_millis(1)).await;

        assert_eq!(outcome, GoodbyeOutcome::SaidBye);
        assert_eq!(*link.calls.lock().unwrap(), vec!["send BYE", "disconnect"]);
    }

    #[tokio::test]
    async fn test_grace_delay_elapses_before_disconnect() {
        let link = RecordingLink {
            connected: true,
            ..Default::default()
        };
        let grace = Duration::from_millis(30);
        let started = std::time::Instant::now();

        graceful_goodbye(&link, grace).await;

        assert!(started.elapsed() >= grace);
    }

    #[tokio::test]
    async fn test_disconnected_link_skips_bye() {
        let link = RecordingLink::default();

        let outcome = graceful_goodbye(&link, Duration::from_millis(1)).await;

        assert_eq!(outcome, GoodbyeOutcome::NotConnected);
        assert_eq!(*link.calls.lock().unwrap(), vec!["disconnect"]);
    }

    #[tokio::test]
    async fn test_failed_bye_still_disconnects() {
        let link = RecordingLink {
            connected: true,
            should_fail: true,
            ..Default::default()
        };

        let outcome = graceful_goodbye(&link, Duration::from_millis(1)).await;

        assert_eq!(outcome, GoodbyeOutcome::ByeFailed("injected failure".to_string()));
        assert_eq!(*link.calls.lock().unwrap(), vec!["disconnect"]);
    }
}
