//! Encoding of operator intents into outbound protocol lines.
//!
//! Commands are plain text with no quoting or escaping.  The only guarantee
//! the encoder adds is structural: required fields are present and the line
//! cannot smuggle in a second line.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Terminator appended to every outbound line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Why a command could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A required field was empty or whitespace only.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// The text contains `\r` or `\n` and would split into several lines.
    #[error("command text must not contain line breaks")]
    LineBreak,
    /// Text that does not name a known vehicle command.
    #[error("unknown vehicle command: {0:?}")]
    UnknownVehicleCommand(String),
}

/// Vehicle manoeuvres accepted by `CMD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleCommand {
    SpeedUp,
    SlowDown,
    TurnLeft,
    TurnRight,
}

impl VehicleCommand {
    pub const ALL: [VehicleCommand; 4] = [
        VehicleCommand::SpeedUp,
        VehicleCommand::SlowDown,
        VehicleCommand::TurnLeft,
        VehicleCommand::TurnRight,
    ];

    /// Wire name, e.g. `SPEED_UP`.
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleCommand::SpeedUp => "SPEED_UP",
            VehicleCommand::SlowDown => "SLOW_DOWN",
            VehicleCommand::TurnLeft => "TURN_LEFT",
            VehicleCommand::TurnRight => "TURN_RIGHT",
        }
    }
}

impl fmt::Display for VehicleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCommand {
    type Err = CommandError;

    /// Case-insensitive, matching how the server upper-cases `CMD` arguments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommandError::UnknownVehicleCommand(wanted.to_string()))
    }
}

/// A structured operator intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `HELLO <name>`
    Hello { name: String },
    /// `AUTH <user> <password>`
    Auth { user: String, password: String },
    /// `CMD <manoeuvre>`
    Vehicle(VehicleCommand),
    /// `USERS`
    Users,
    /// `BYE`
    Bye,
    /// Operator-typed line sent as is.
    Raw(String),
}

impl Command {
    pub fn hello(name: impl Into<String>) -> Self {
        Command::Hello { name: name.into() }
    }

    pub fn auth(user: impl Into<String>, password: impl Into<String>) -> Self {
        Command::Auth {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Command::Raw(text.into())
    }

    /// Builds the command line without its terminator.
    ///
    /// # Errors
    ///
    /// [`CommandError::Empty`] when a required field is blank and
    /// [`CommandError::LineBreak`] when any field contains `\r` or `\n`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetry_core::protocol::Command;
    ///
    /// assert_eq!(Command::hello(" Ana ").encode().unwrap(), "HELLO Ana");
    /// assert_eq!(Command::auth("admin", "").encode().unwrap(), "AUTH admin ");
    /// ```
    pub fn encode(&self) -> Result<String, CommandError> {
        let line = match self {
            Command::Hello { name } => format!("HELLO {}", required("name", name)?),
            Command::Auth { user, password } => {
                format!("AUTH {} {}", required("user", user)?, password)
            }
            Command::Vehicle(cmd) => format!("CMD {cmd}"),
            Command::Users => "USERS".to_string(),
            Command::Bye => "BYE".to_string(),
            Command::Raw(text) => required("command", text)?.to_string(),
        };
        ensure_single_line(&line)?;
        Ok(line)
    }

    /// Builds the full wire form, CRLF included.
    pub fn to_wire(&self) -> Result<String, CommandError> {
        Ok(frame_line(&self.encode()?))
    }
}

/// Rejects text that would not stay on one line.
pub fn ensure_single_line(line: &str) -> Result<(), CommandError> {
    if line.contains(['\r', '\n']) {
        return Err(CommandError::LineBreak);
    }
    Ok(())
}

/// Appends the outbound terminator.
pub fn frame_line(line: &str) -> String {
    let mut wire = String::with_capacity(line.len() + LINE_TERMINATOR.len());
    wire.push_str(line);
    wire.push_str(LINE_TERMINATOR);
    wire
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::Empty(field));
    }
    Ok(trimmed)
}
