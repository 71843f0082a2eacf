//! ConsoleView: folds client events into what the operator sees.
//!
//! The engine never decides how a missing value is displayed; this view
//! does.  It keeps the latest value of the four headline telemetry fields
//! (shown as `-` until the server sends them), the granted role, the
//! connection label, the protocol version announced by the server, the last
//! reply, and the most recent user listing.  Every event also produces one
//! tagged log line such as `[NACK] NACK low_battery` or
//! `[ERROR 403] not_admin`.

use telemetry_core::protocol::{
    records::{welcome_protocol_version, ErrorRecord, ReplyRecord, UserRecord},
    ProtocolEvent, Session, TelemetryFields,
};

use crate::infrastructure::network::{ClientEvent, CloseReason};

/// Placeholder for a telemetry value the server has not sent yet.
pub const MISSING_VALUE: &str = "-";

/// Headline telemetry fields, in display order, with their labels.
const HEADLINE_FIELDS: [(&str, &str); 4] = [
    ("speed", "Speed (km/h)"),
    ("battery", "Battery (%)"),
    ("temp", "Temperature (C)"),
    ("heading", "Heading (deg)"),
];

/// Operator-facing state derived from [`ClientEvent`]s.
#[derive(Debug, Clone)]
pub struct ConsoleView {
    connection: String,
    /// Role as granted by the server; the listing flag is not tracked here.
    session: Session,
    protocol_version: Option<String>,
    last_reply: Option<ReplyRecord>,
    latest: TelemetryFields,
    /// Entries of a listing still being received.
    pending_users: Vec<String>,
    /// Entries of the last completed listing.
    users: Vec<String>,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self {
            connection: "Disconnected".to_string(),
            session: Session::default(),
            protocol_version: None,
            last_reply: None,
            latest: TelemetryFields::new(),
            pending_users: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event and returns the log line describing it.
    pub fn apply(&mut self, event: &ClientEvent) -> String {
        match event {
            ClientEvent::Connected { peer, .. } => {
                self.connection = format!("Connected to {peer}");
                format!("Connected to {peer}")
            }
            ClientEvent::ConnectionClosed { reason, .. } => {
                self.connection = "Disconnected".to_string();
                self.session.reset();
                self.protocol_version = None;
                self.last_reply = None;
                self.pending_users.clear();
                match reason {
                    CloseReason::PeerClosed => "Connection closed by server".to_string(),
                    CloseReason::ReadError(e) => format!("Read error: {e}"),
                    CloseReason::LocalDisconnect => "Connection closed".to_string(),
                    CloseReason::ConsumerGone => "Connection closed (no listener)".to_string(),
                }
            }
            ClientEvent::Protocol(event) => self.apply_protocol(event),
        }
    }

    fn apply_protocol(&mut self, event: &ProtocolEvent) -> String {
        let tag = event.tag();
        match event {
            ProtocolEvent::TelemetryUpdate(fields) => {
                for (key, value) in fields.iter() {
                    self.latest.insert(key, value);
                }
                let summary: Vec<String> =
                    fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("[{tag}] {}", summary.join(" "))
            }
            ProtocolEvent::RoleAssigned(role) => {
                self.session.role = role.clone();
                format!("[{tag}] {role}")
            }
            ProtocolEvent::Welcome(raw) => {
                self.protocol_version = welcome_protocol_version(raw).map(str::to_string);
                format!("[{tag}] {raw}")
            }
            ProtocolEvent::ErrorNotice(raw) => match ErrorRecord::parse(raw) {
                Some(err) => format!("[{tag} {}] {}", err.code, err.reason),
                None => format!("[{tag}] {raw}"),
            },
            ProtocolEvent::Ack(raw) | ProtocolEvent::Nack(raw) | ProtocolEvent::Ok(raw) => {
                if let Some(reply) = ReplyRecord::parse(raw) {
                    self.last_reply = Some(reply);
                }
                format!("[{tag}] {raw}")
            }
            ProtocolEvent::UserListStart { raw, .. } => {
                self.pending_users.clear();
                format!("[{tag}] {raw}")
            }
            ProtocolEvent::UserEntry(raw) => {
                self.pending_users.push(raw.clone());
                format!("[{tag}] {raw}")
            }
            ProtocolEvent::UserListEnd(raw) => {
                self.users = std::mem::take(&mut self.pending_users);
                format!("[{tag}] {raw}")
            }
            ProtocolEvent::Unknown(raw) => format!("[{tag}] {raw}"),
        }
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn role(&self) -> &str {
        &self.session.role
    }

    /// Version from the last `WELCOME` banner of this connection.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Most recent `ACK`, `NACK` or `OK` reply of this connection.
    pub fn last_reply(&self) -> Option<&ReplyRecord> {
        self.last_reply.as_ref()
    }

    /// Latest value of a telemetry field, or [`MISSING_VALUE`].
    pub fn value(&self, key: &str) -> &str {
        self.latest.get(key).unwrap_or(MISSING_VALUE)
    }

    /// Raw entries of the last completed user listing.
    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Parsed view of [`Self::users`]; unparsable entries are skipped.
    pub fn user_records(&self) -> Vec<UserRecord> {
        self.users.iter().filter_map(|u| UserRecord::parse(u)).collect()
    }

    /// Multi-line panel with connection, role and headline telemetry.
    ///
    /// The last reply and the admin hint are appended only when present.
    pub fn render_panel(&self) -> String {
        let mut out = format!("{} | Role: {}", self.connection, self.session.role);
        if let Some(version) = &self.protocol_version {
            out.push_str(&format!(" | PROTO {version}"));
        }
        out.push('\n');
        for (key, label) in HEADLINE_FIELDS {
            out.push_str(&format!("  {label:<16} {}\n", self.value(key)));
        }
        if let Some(reply) = &self.last_reply {
            out.push_str(&format!("  Last reply: {} {}\n", reply.verb, reply.detail));
        }
        if self.session.is_admin() {
            out.push_str("  Admin: /users lists connected clients\n");
        }
        out
    }
}
