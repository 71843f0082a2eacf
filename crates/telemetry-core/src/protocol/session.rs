//! Per-connection protocol session state.
//!
//! The session is the only state the decoder carries from one line to the
//! next: the role last granted by the server and whether a `USERS` listing is
//! currently open.  It is a plain value; the decoder takes it by value and
//! returns the successor alongside each event.

/// Role every connection starts with until the server says otherwise.
pub const DEFAULT_ROLE: &str = "VIEWER";

/// Decoder-owned session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Role granted by the most recent `ROLE` line.
    pub role: String,
    /// True between `USERS count=N` and the matching `OK users`.
    pub awaiting_user_list: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the server has granted the `ADMIN` role.
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("ADMIN")
    }

    /// Restores the defaults a fresh connection starts with.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
            awaiting_user_list: false,
        }
    }
}
