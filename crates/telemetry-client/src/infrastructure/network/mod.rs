//! Network infrastructure: the PROTO 1.0 connection manager.
//!
//! Owns the TCP connection to the telemetry server, runs the read loop that
//! turns inbound bytes into [`ProtocolEvent`]s, and serialises outbound
//! command lines.
//!
//! Architecture:
//! - `TelemetryClient` holds at most one active connection.
//! - The read half belongs to a per-connection tokio task (the read loop).
//!   It frames lines, decodes them against the connection's session, and
//!   forwards [`ClientEvent`]s on an `mpsc` channel.
//! - The write half sits behind its own async `Mutex`, so exactly one `send`
//!   is in flight at a time.  The connection table lock is only held for
//!   lookups, never across socket I/O, so a peer that stops reading cannot
//!   stall `status`, `disconnect` or the read loop.
//! - `disconnect` removes the connection and signals shutdown.  A `send`
//!   blocked on a full socket observes the signal and gives up; the read loop
//!   notices it, emits `ConnectionClosed`, and exits on its own.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use telemetry_core::protocol::{
    commands::ensure_single_line, frame_line, Command, CommandError, Decoder, LineFramer,
    ProtocolEvent, Session, VehicleCommand,
};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::{mpsc, watch, Mutex},
    time,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::goodbye::OperatorLink;

/// Size of the buffer handed to each socket read.
const READ_BUFFER_SIZE: usize = 4096;

/// Errors from [`TelemetryClient::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server did not accept within the connect timeout.
    #[error("timed out after {0:?} connecting to server")]
    Timeout(Duration),
    /// The server actively refused the connection.
    #[error("connection refused by {0}")]
    Refused(String),
    /// A connection is already active or being opened.
    #[error("already connected")]
    AlreadyConnected,
    /// Any other transport failure (name resolution, unreachable host, ...).
    #[error("connect failed: {0}")]
    Other(String),
}

/// Errors from [`TelemetryClient::send`] and the command helpers.
#[derive(Debug, Error)]
pub enum SendError {
    /// No connection is active.
    #[error("not connected")]
    NotConnected,
    /// Writing to the socket failed.
    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),
    /// The command could not be encoded.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
}

/// Connection lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a connection's read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the stream.
    PeerClosed,
    /// A read failed.
    ReadError(String),
    /// [`TelemetryClient::disconnect`] was called.
    LocalDisconnect,
    /// The event receiver was dropped.
    ConsumerGone,
}

/// Events delivered to the presentation layer.
///
/// They are sent from the read loop's task; consumers that render on their
/// own thread must hand them off themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A connection was established.
    Connected { id: Uuid, peer: SocketAddr },
    /// A server line was decoded.
    Protocol(ProtocolEvent),
    /// The connection ended; emitted exactly once per connection.
    ConnectionClosed { id: Uuid, reason: CloseReason },
}

/// Identity of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: Uuid,
    pub peer: SocketAddr,
}

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ClientConnectionConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Upper bound on the TCP connect phase.  Reads are never timed out.
    pub connect_timeout: Duration,
    /// Optional clamp on inbound line length; `None` means unlimited.
    pub max_line_len: Option<usize>,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for ClientConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            connect_timeout: Duration::from_secs(5),
            max_line_len: None,
            event_capacity: 128,
        }
    }
}

/// The connection currently owned by the manager.
struct ActiveConnection {
    id: Uuid,
    peer: SocketAddr,
    /// `None` once the write half has been shut down.
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    /// Dropping or signalling this stops the read loop and in-flight sends.
    shutdown: watch::Sender<bool>,
    /// Session as last published by the read loop.
    session: watch::Receiver<Session>,
}

impl ActiveConnection {
    /// Signals shutdown, then closes the write half.
    ///
    /// The signal goes first: a `send` holding the writer lock is blocked on
    /// the socket and only releases the lock once it sees the signal.
    async fn close(self) {
        self.shutdown.send_replace(true);
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(id = %self.id, "error shutting down write half: {e}");
            }
        }
    }
}

/// Manages the single PROTO 1.0 connection to the telemetry server.
pub struct TelemetryClient {
    config: ClientConnectionConfig,
    active: Arc<Mutex<Option<ActiveConnection>>>,
    connecting: AtomicBool,
    events: mpsc::Sender<ClientEvent>,
}

impl TelemetryClient {
    /// Creates a disconnected client and the receiver its events arrive on.
    pub fn new(config: ClientConnectionConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let client = Self {
            config,
            active: Arc::new(Mutex::new(None)),
            connecting: AtomicBool::new(false),
            events: tx,
        };
        (client, rx)
    }

    pub fn config(&self) -> &ClientConnectionConfig {
        &self.config
    }

    /// Connects using the configured host, port and timeout.
    pub async fn connect_with_config(&self) -> Result<ConnectionInfo, ConnectError> {
        let host = self.config.host.clone();
        self.connect(&host, self.config.port, self.config.connect_timeout)
            .await
    }

    /// Opens a connection and starts its read loop.
    ///
    /// # Errors
    ///
    /// [`ConnectError::Timeout`] if the server does not accept within
    /// `connect_timeout`, [`ConnectError::Refused`] if it rejects the
    /// connection, [`ConnectError::AlreadyConnected`] if a connection is
    /// already active, and [`ConnectError::Other`] for anything else.
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<ConnectionInfo, ConnectError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(ConnectError::AlreadyConnected);
        }
        let _connecting = ConnectingGuard(&self.connecting);
        self.open(host, port, connect_timeout).await
    }

    async fn open(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<ConnectionInfo, ConnectError> {
        if self.active.lock().await.is_some() {
            return Err(ConnectError::AlreadyConnected);
        }

        info!("connecting to {host}:{port}");
        let stream = match time::timeout(connect_timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!("could not connect to {host}:{port}: {e}");
                return Err(classify_connect_error(&format!("{host}:{port}"), e));
            }
            Err(_) => {
                warn!("connect to {host}:{port} timed out after {connect_timeout:?}");
                return Err(ConnectError::Timeout(connect_timeout));
            }
        };
        let peer = stream
            .peer_addr()
            .map_err(|e| ConnectError::Other(e.to_string()))?;

        let id = Uuid::new_v4();
        let (reader, writer) = stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (session_tx, session_rx) = watch::channel(Session::default());

        {
            let mut guard = self.active.lock().await;
            *guard = Some(ActiveConnection {
                id,
                peer,
                writer: Arc::new(Mutex::new(Some(writer))),
                shutdown: shutdown_tx,
                session: session_rx,
            });
        }
        info!(%id, "connected to {peer}");

        // Queued before the read loop starts so it precedes every protocol
        // event.  Never waits: a full channel drops the notice.
        if let Err(e) = self.events.try_send(ClientEvent::Connected { id, peer }) {
            warn!(%id, "could not queue Connected event: {e}");
        }

        let read_loop = ReadLoop {
            id,
            reader,
            shutdown: shutdown_rx,
            session: session_tx,
            framer: match self.config.max_line_len {
                Some(max) => LineFramer::with_max_line_len(max),
                None => LineFramer::new(),
            },
            active: Arc::clone(&self.active),
            events: self.events.clone(),
        };
        tokio::spawn(read_loop.run());

        Ok(ConnectionInfo { id, peer })
    }

    /// Writes one line followed by CRLF.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] when there is no active connection (no
    /// socket operation is attempted), [`SendError::InvalidCommand`] when
    /// `line` contains a line break, [`SendError::Io`] when the write fails
    /// or the connection is closed while the write is pending.
    pub async fn send(&self, line: &str) -> Result<(), SendError> {
        ensure_single_line(line)?;

        let (id, writer, mut shutdown) = {
            let guard = self.active.lock().await;
            let conn = guard.as_ref().ok_or(SendError::NotConnected)?;
            (conn.id, Arc::clone(&conn.writer), conn.shutdown.subscribe())
        };
        let framed = frame_line(line);

        let write = async {
            let mut writer = writer.lock().await;
            let half = writer.as_mut().ok_or(SendError::NotConnected)?;
            half.write_all(framed.as_bytes()).await?;
            Ok::<_, SendError>(())
        };
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!(%id, "connection closed with a send pending");
                Err(SendError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionAborted,
                    "connection closed while sending",
                )))
            }
            result = write => {
                result?;
                debug!(%id, ">> {line}");
                Ok(())
            }
        }
    }

    /// Encodes and sends a structured command.
    pub async fn send_command(&self, command: &Command) -> Result<(), SendError> {
        let line = command.encode()?;
        self.send(&line).await
    }

    pub async fn hello(&self, name: &str) -> Result<(), SendError> {
        self.send_command(&Command::hello(name)).await
    }

    pub async fn auth(&self, user: &str, password: &str) -> Result<(), SendError> {
        self.send_command(&Command::auth(user, password)).await
    }

    pub async fn vehicle(&self, command: VehicleCommand) -> Result<(), SendError> {
        self.send_command(&Command::Vehicle(command)).await
    }

    pub async fn list_users(&self) -> Result<(), SendError> {
        self.send_command(&Command::Users).await
    }

    pub async fn bye(&self) -> Result<(), SendError> {
        self.send_command(&Command::Bye).await
    }

    pub async fn send_raw(&self, text: &str) -> Result<(), SendError> {
        self.send_command(&Command::raw(text)).await
    }

    /// Closes the active connection, if any.
    ///
    /// Idempotent.  Close-time errors are logged and otherwise ignored.  The
    /// read loop observes the shutdown and emits `ConnectionClosed` itself;
    /// a pending `send` returns [`SendError::Io`].
    pub async fn disconnect(&self) {
        let Some(conn) = self.active.lock().await.take() else {
            debug!("disconnect requested with no active connection");
            return;
        };
        info!(id = %conn.id, "closing connection to {}", conn.peer);
        conn.close().await;
    }

    pub async fn status(&self) -> ConnectionStatus {
        if self.active.lock().await.is_some() {
            ConnectionStatus::Connected
        } else if self.connecting.load(Ordering::SeqCst) {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Disconnected
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.status().await == ConnectionStatus::Connected
    }

    /// Snapshot of the active connection's session; defaults when disconnected.
    pub async fn session(&self) -> Session {
        match self.active.lock().await.as_ref() {
            Some(conn) => conn.session.borrow().clone(),
            None => Session::default(),
        }
    }

    /// Identity of the active connection, if any.
    pub async fn connection_info(&self) -> Option<ConnectionInfo> {
        self.active.lock().await.as_ref().map(|c| ConnectionInfo {
            id: c.id,
            peer: c.peer,
        })
    }
}

#[async_trait]
impl OperatorLink for TelemetryClient {
    async fn is_connected(&self) -> bool {
        TelemetryClient::is_connected(self).await
    }

    async fn send_command(&self, command: &Command) -> Result<(), String> {
        TelemetryClient::send_command(self, command)
            .await
            .map_err(|e| e.to_string())
    }

    async fn disconnect(&self) {
        TelemetryClient::disconnect(self).await
    }
}

/// Clears the `connecting` flag when `connect` finishes or is cancelled.
struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// State moved into the per-connection read task.
struct ReadLoop {
    id: Uuid,
    reader: OwnedReadHalf,
    shutdown: watch::Receiver<bool>,
    session: watch::Sender<Session>,
    framer: LineFramer,
    active: Arc<Mutex<Option<ActiveConnection>>>,
    events: mpsc::Sender<ClientEvent>,
}

impl ReadLoop {
    async fn run(mut self) {
        let reason = self.pump().await;
        let id = self.id;

        // Tear down only if this loop's connection is still the active one;
        // after `disconnect` it already is gone.
        let stale = {
            let mut guard = self.active.lock().await;
            if guard.as_ref().is_some_and(|c| c.id == id) {
                guard.take()
            } else {
                None
            }
        };
        if let Some(conn) = stale {
            conn.close().await;
        }

        match &reason {
            CloseReason::ReadError(e) => warn!(%id, "read error on connection: {e}"),
            other => info!(%id, "connection closed: {other:?}"),
        }
        let _ = self
            .events
            .send(ClientEvent::ConnectionClosed { id, reason })
            .await;
    }

    async fn pump(&mut self) -> CloseReason {
        let mut decoder = Decoder::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let read = tokio::select! {
                biased;
                _ = self.shutdown.changed() => None,
                r = self.reader.read(&mut buf) => Some(r),
            };
            let n = match read {
                None => return CloseReason::LocalDisconnect,
                Some(Ok(0)) => return CloseReason::PeerClosed,
                Some(Ok(n)) => n,
                Some(Err(e)) => return CloseReason::ReadError(e.to_string()),
            };

            for line in self.framer.feed(&buf[..n]) {
                debug!(id = %self.id, "<< {line}");
                let event = decoder.decode(&line);
                self.session.send_if_modified(|published| {
                    if published != decoder.session() {
                        *published = decoder.session().clone();
                        true
                    } else {
                        false
                    }
                });
                if self.events.send(ClientEvent::Protocol(event)).await.is_err() {
                    return CloseReason::ConsumerGone;
                }
            }
        }
    }
}

/// Maps a connect-phase I/O error onto the [`ConnectError`] taxonomy.
fn classify_connect_error(target: &str, e: std::io::Error) -> ConnectError {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => ConnectError::Refused(target.to_string()),
        _ => ConnectError::Other(format!("{target}: {e}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
