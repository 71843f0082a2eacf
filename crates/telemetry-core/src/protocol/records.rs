//! Structured views of raw event payloads.
//!
//! Classification never depends on these parsers; they are helpers for
//! consumers that want more than the raw line.  Each returns `None` when the
//! line does not have the expected shape.

/// One `USER` line of a listing.
///
/// The server formats entries as
/// `USER <index> ip=<addr> port=<port> role=<ROLE> name=<name or ->`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub index: u32,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub role: Option<String>,
    /// `None` when the client never introduced itself (`name=-`).
    pub name: Option<String>,
}

impl UserRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.strip_prefix("USER ")?.split_whitespace();
        let index = tokens.next()?.parse().ok()?;

        let mut record = UserRecord {
            index,
            ip: None,
            port: None,
            role: None,
            name: None,
        };
        for (key, value) in tokens.filter_map(|t| t.split_once('=')) {
            match key {
                "ip" => record.ip = Some(value.to_string()),
                "port" => record.port = value.parse().ok(),
                "role" => record.role = Some(value.to_string()),
                "name" if value != "-" => record.name = Some(value.to_string()),
                _ => {}
            }
        }
        Some(record)
    }
}

/// An `ERROR <code> <reason>` line, e.g. `ERROR 403 not_admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub code: u16,
    pub reason: String,
}

impl ErrorRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let (code, reason) = line.strip_prefix("ERROR ")?.trim().split_once(' ')?;
        Some(ErrorRecord {
            code: code.parse().ok()?,
            reason: reason.trim().to_string(),
        })
    }
}

/// `ACK`/`NACK`/`OK` reply split into verb and detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRecord {
    pub verb: String,
    pub detail: String,
}

impl ReplyRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let (verb, detail) = line.trim().split_once(' ')?;
        if !matches!(verb, "ACK" | "NACK" | "OK") {
            return None;
        }
        Some(ReplyRecord {
            verb: verb.to_string(),
            detail: detail.trim().to_string(),
        })
    }
}

/// Extracts the protocol version from a banner like
/// `WELCOME TelemetryServer PROTO 1.0`.
pub fn welcome_protocol_version(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    tokens.find(|t| *t == "PROTO")?;
    tokens.next()
}
