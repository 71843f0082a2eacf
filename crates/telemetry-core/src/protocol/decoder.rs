//! Classification of server lines into [`ProtocolEvent`]s.
//!
//! Decoding is a pure function of `(line, session)`.  The only context that
//! flows between lines is the [`Session`], which is passed in by value and
//! returned, updated, next to the event.  That keeps the `USERS` listing
//! sub-protocol testable without a socket:
//!
//! ```text
//! USERS count=2      -> UserListStart   awaiting_user_list = true
//! USER 0 ip=...      -> UserEntry
//! USER 1 ip=...      -> UserEntry
//! OK users           -> UserListEnd     awaiting_user_list = false
//! ```
//!
//! Outside an open listing, `USER ...` is `Unknown` and `OK users` is a plain
//! `Ok`.
//!
//! # Classification order
//!
//! The first matching literal prefix wins.  The `USER` and `OK users` checks
//! must run before the generic `OK ` prefix or the listing terminator would
//! be misread as an ordinary reply.

use tracing::debug;

use crate::protocol::events::{DecodeAnomaly, ProtocolEvent, TelemetryFields};
use crate::protocol::session::Session;

const DATA_PREFIX: &str = "DATA ";
const WELCOME_PREFIX: &str = "WELCOME";
const ROLE_PREFIX: &str = "ROLE ";
const ACK_PREFIX: &str = "ACK ";
const NACK_PREFIX: &str = "NACK ";
const ERROR_PREFIX: &str = "ERROR ";
const USERS_PREFIX: &str = "USERS count=";
const USER_PREFIX: &str = "USER ";
const USERS_END_PREFIX: &str = "OK users";
const OK_PREFIX: &str = "OK ";

/// Classifies one line against the current session.
///
/// Returns the event and the session to use for the next line.
///
/// # Examples
///
/// ```rust
/// use telemetry_core::protocol::{decode_line, ProtocolEvent, Session};
///
/// let (event, session) = decode_line("ROLE ADMIN", Session::default());
/// assert_eq!(event, ProtocolEvent::RoleAssigned("ADMIN".to_string()));
/// assert_eq!(session.role, "ADMIN");
/// ```
pub fn decode_line(line: &str, mut session: Session) -> (ProtocolEvent, Session) {
    let raw = || line.to_string();

    let event = if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
        let (fields, anomalies) = parse_data_payload(payload);
        if !anomalies.is_empty() {
            debug!(count = anomalies.len(), "skipped malformed DATA tokens: {anomalies:?}");
        }
        ProtocolEvent::TelemetryUpdate(fields)
    } else if line.starts_with(WELCOME_PREFIX) {
        ProtocolEvent::Welcome(raw())
    } else if let Some(rest) = line.strip_prefix(ROLE_PREFIX) {
        let role = rest.trim().to_string();
        session.role = role.clone();
        ProtocolEvent::RoleAssigned(role)
    } else if line.starts_with(ACK_PREFIX) {
        ProtocolEvent::Ack(raw())
    } else if line.starts_with(NACK_PREFIX) {
        ProtocolEvent::Nack(raw())
    } else if line.starts_with(ERROR_PREFIX) {
        ProtocolEvent::ErrorNotice(raw())
    } else if let Some(rest) = line.strip_prefix(USERS_PREFIX) {
        if session.awaiting_user_list {
            debug!("new USERS listing replaces one that was never terminated");
        }
        session.awaiting_user_list = true;
        ProtocolEvent::UserListStart {
            count: rest.trim().parse().ok(),
            raw: raw(),
        }
    } else if session.awaiting_user_list && line.starts_with(USER_PREFIX) {
        ProtocolEvent::UserEntry(raw())
    } else if session.awaiting_user_list && line.starts_with(USERS_END_PREFIX) {
        session.awaiting_user_list = false;
        ProtocolEvent::UserListEnd(raw())
    } else if line.starts_with(OK_PREFIX) {
        ProtocolEvent::Ok(raw())
    } else {
        ProtocolEvent::Unknown(raw())
    };

    (event, session)
}

/// Parses the space-separated `key=value` tokens of a `DATA` payload.
///
/// Only the first `=` splits a token, so `note=a=b` yields `note -> "a=b"`.
/// Malformed tokens are reported and skipped; they never stop the remaining
/// tokens from being parsed.
pub fn parse_data_payload(payload: &str) -> (TelemetryFields, Vec<DecodeAnomaly>) {
    let mut fields = TelemetryFields::new();
    let mut anomalies = Vec::new();

    for token in payload.split_whitespace() {
        match token.split_once('=') {
            Some(("", _)) => anomalies.push(DecodeAnomaly::EmptyKey(token.to_string())),
            Some((key, value)) => fields.insert(key, value),
            None => anomalies.push(DecodeAnomaly::MissingSeparator(token.to_string())),
        }
    }

    (fields, anomalies)
}

/// Stateful wrapper around [`decode_line`] for a single connection.
///
/// The read loop owns one `Decoder` per connection; nothing else can reach
/// its session, so there is exactly one writer.
#[derive(Debug, Default)]
pub struct Decoder {
    session: Session,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `line` and advances the session.
    pub fn decode(&mut self, line: &str) -> ProtocolEvent {
        let (event, next) = decode_line(line, std::mem::take(&mut self.session));
        self.session = next;
        event
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> ProtocolEvent {
        decode_line(line, Session::default()).0
    }

    fn listing_session() -> Session {
        Session {
            awaiting_user_list: true,
            ..Session::default()
        }
    }

    #[test]
    fn test_data_line_decodes_all_fields() {
        let event = decode("DATA speed=52.3 battery=89 temp=36.2 heading=175");

        let expected: TelemetryFields = [
            ("speed", "52.3"),
            ("battery", "89"),
            ("temp", "36.2"),
            ("heading", "175"),
        ]
        .into_iter()
        .collect();
        assert_eq!(event, ProtocolEvent::TelemetryUpdate(expected));
    }

    #[test]
    fn test_data_line_keeps_unknown_keys_and_skips_bad_tokens() {
        let ProtocolEvent::TelemetryUpdate(fields) =
            decode("DATA speed=10.0 garbage =5 ts=1700000000000 note=a=b")
        else {
            panic!("expected telemetry");
        };

        assert_eq!(fields.get("speed"), Some("10.0"));
        assert_eq!(fields.get("ts"), Some("1700000000000"));
        assert_eq!(fields.get("note"), Some("a=b"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_parse_data_payload_reports_anomalies() {
        let (fields, anomalies) = parse_data_payload("a=1 junk =2 b=");

        assert_eq!(fields.get("a"), Some("1"));
        assert_eq!(fields.get("b"), Some(""));
        assert_eq!(
            anomalies,
            vec![
                DecodeAnomaly::MissingSeparator("junk".to_string()),
                DecodeAnomaly::EmptyKey("=2".to_string()),
            ]
        );
    }

    #[test]
    fn test_bare_data_keyword_is_unknown() {
        assert_eq!(decode("DATA"), ProtocolEvent::Unknown("DATA".to_string()));
    }

    #[test]
    fn test_welcome_prefix_without_space() {
        let line = "WELCOME TelemetryServer PROTO 1.0";
        assert_eq!(decode(line), ProtocolEvent::Welcome(line.to_string()));
    }

    #[test]
    fn test_role_updates_session() {
        let (event, session) = decode_line("ROLE  ADMIN ", Session::default());

        assert_eq!(event, ProtocolEvent::RoleAssigned("ADMIN".to_string()));
        assert_eq!(session.role, "ADMIN");
    }

    #[test]
    fn test_replies_keep_raw_line() {
        assert_eq!(
            decode("ACK SPEED_UP accepted"),
            ProtocolEvent::Ack("ACK SPEED_UP accepted".to_string())
        );
        assert_eq!(
            decode("NACK low_battery"),
            ProtocolEvent::Nack("NACK low_battery".to_string())
        );
        assert_eq!(
            decode("ERROR 403 not_admin"),
            ProtocolEvent::ErrorNotice("ERROR 403 not_admin".to_string())
        );
        assert_eq!(decode("OK auth"), ProtocolEvent::Ok("OK auth".to_string()));
    }

    #[test]
    fn test_users_block_lifecycle() {
        let (start, s1) = decode_line("USERS count=2", Session::default());
        let (entry, s2) = decode_line("USER alice", s1.clone());
        let (end, s3) = decode_line("OK users", s2.clone());

        assert_eq!(
            start,
            ProtocolEvent::UserListStart {
                count: Some(2),
                raw: "USERS count=2".to_string()
            }
        );
        assert!(s1.awaiting_user_list);
        assert_eq!(entry, ProtocolEvent::UserEntry("USER alice".to_string()));
        assert!(s2.awaiting_user_list);
        assert_eq!(end, ProtocolEvent::UserListEnd("OK users".to_string()));
        assert!(!s3.awaiting_user_list);
    }

    #[test]
    fn test_user_line_outside_listing_is_unknown() {
        assert_eq!(
            decode("USER alice"),
            ProtocolEvent::Unknown("USER alice".to_string())
        );
    }

    #[test]
    fn test_ok_users_outside_listing_is_plain_ok() {
        let (event, session) = decode_line("OK users", Session::default());

        assert_eq!(event, ProtocolEvent::Ok("OK users".to_string()));
        assert!(!session.awaiting_user_list);
    }

    #[test]
    fn test_generic_ok_inside_listing_does_not_close_it() {
        let (event, session) = decode_line("OK hello Ana", listing_session());

        assert_eq!(event, ProtocolEvent::Ok("OK hello Ana".to_string()));
        assert!(session.awaiting_user_list);
    }

    #[test]
    fn test_second_users_header_replaces_open_listing() {
        let (event, session) = decode_line("USERS count=5", listing_session());

        assert!(matches!(event, ProtocolEvent::UserListStart { count: Some(5), .. }));
        assert!(session.awaiting_user_list);
    }

    #[test]
    fn test_users_header_with_bad_count() {
        let (event, _) = decode_line("USERS count=many", Session::default());

        assert!(matches!(event, ProtocolEvent::UserListStart { count: None, .. }));
    }

    #[test]
    fn test_unmatched_line_is_unknown() {
        assert_eq!(decode("PING"), ProtocolEvent::Unknown("PING".to_string()));
    }

    #[test]
    fn test_decoder_threads_session_between_lines() {
        let mut decoder = Decoder::new();

        decoder.decode("ROLE ADMIN");
        decoder.decode("USERS count=1");
        let entry = decoder.decode("USER 0 ip=10.0.0.1 port=5000 role=ADMIN name=-");

        assert!(matches!(entry, ProtocolEvent::UserEntry(_)));
        assert_eq!(decoder.session().role, "ADMIN");
        assert!(decoder.session().awaiting_user_list);

        decoder.reset();
        assert_eq!(decoder.session(), &Session::default());
    }
}
