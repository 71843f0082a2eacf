//! Typed events produced by decoding server lines.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

/// One decoded server line.
///
/// Every variant except [`ProtocolEvent::RoleAssigned`],
/// [`ProtocolEvent::TelemetryUpdate`] and [`ProtocolEvent::UserListStart`]
/// carries the raw line unchanged; structured views of those payloads live in
/// [`crate::protocol::records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Server banner, e.g. `WELCOME TelemetryServer PROTO 1.0`.
    Welcome(String),
    /// `ROLE <name>`: the role the server now grants this client.
    RoleAssigned(String),
    /// `DATA k=v ...`: a telemetry sample.
    TelemetryUpdate(TelemetryFields),
    /// `ACK ...`: a vehicle command was accepted.
    Ack(String),
    /// `NACK ...`: a vehicle command was refused.
    Nack(String),
    /// `ERROR <code> <reason>`.
    ErrorNotice(String),
    /// `USERS count=<N>`: opens a user listing.
    UserListStart {
        /// Parsed `N`, `None` if the server sent something that is not a count.
        count: Option<u32>,
        raw: String,
    },
    /// `USER ...` inside an open listing.
    UserEntry(String),
    /// `OK users`: closes the open listing.
    UserListEnd(String),
    /// Any other `OK ...` reply.
    Ok(String),
    /// Anything not matched above.
    Unknown(String),
}

impl ProtocolEvent {
    /// Short tag used when logging or displaying the event.
    pub fn tag(&self) -> &'static str {
        match self {
            ProtocolEvent::Welcome(_) => "WELCOME",
            ProtocolEvent::RoleAssigned(_) => "ROLE",
            ProtocolEvent::TelemetryUpdate(_) => "DATA",
            ProtocolEvent::Ack(_) => "ACK",
            ProtocolEvent::Nack(_) => "NACK",
            ProtocolEvent::ErrorNotice(_) => "ERROR",
            ProtocolEvent::UserListStart { .. } => "USERS",
            ProtocolEvent::UserEntry(_) => "USER",
            ProtocolEvent::UserListEnd(_) => "USERS END",
            ProtocolEvent::Ok(_) => "OK",
            ProtocolEvent::Unknown(_) => "UNKNOWN",
        }
    }
}

/// Key/value pairs carried by a `DATA` line.
///
/// Values are opaque strings.  Keys the engine has never heard of are kept;
/// keys the server did not send are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryFields(BTreeMap<String, String>);

impl TelemetryFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any earlier value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parses a field into `T`; `None` when absent or unparsable.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.parse(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TelemetryFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// A malformed token inside an otherwise valid line.
///
/// Anomalies are recovered where they occur: the token is skipped and
/// parsing continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeAnomaly {
    /// A `DATA` token without `=`.
    #[error("token without '=' separator: {0:?}")]
    MissingSeparator(String),
    /// A `DATA` token of the form `=value`.
    #[error("token with empty key: {0:?}")]
    EmptyKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_parse_typed_values() {
        let fields: TelemetryFields = [("speed", "52.3"), ("battery", "89"), ("mode", "auto")]
            .into_iter()
            .collect();

        assert_eq!(fields.get_f64("speed"), Some(52.3));
        assert_eq!(fields.parse::<u8>("battery"), Some(89));
        assert_eq!(fields.get_f64("mode"), None);
        assert_eq!(fields.get("heading"), None);
    }

    #[test]
    fn test_fields_later_insert_wins() {
        let mut fields = TelemetryFields::new();
        fields.insert("temp", "30.0");
        fields.insert("temp", "31.5");

        assert_eq!(fields.get("temp"), Some("31.5"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_tag_names_user_list_end() {
        let event = ProtocolEvent::UserListEnd("OK users".to_string());
        assert_eq!(event.tag(), "USERS END");
    }
}
