//! Parsing of operator input lines typed into the console.
//!
//! Lines starting with `/` are console shortcuts; anything else is sent to
//! the server verbatim, the same as the free-text command box of a GUI
//! client.

use telemetry_core::protocol::{Command, VehicleCommand};

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Send a command to the server.
    Send(Command),
    /// Open a connection using the configured server.
    Connect,
    /// Close the connection immediately.
    Disconnect,
    /// Print the telemetry panel.
    Status,
    /// Print the shortcut list.
    Help,
    /// Say goodbye and exit.
    Quit,
    /// Blank line.
    Nothing,
    /// A shortcut that could not be understood.
    Invalid(String),
}

/// Help text listing every shortcut.
pub const HELP: &str = "\
/hello NAME         introduce yourself (HELLO)
/auth USER [PASS]   authenticate (AUTH)
/speed-up /slow-down /left /right
                    vehicle commands (CMD ...)
/cmd NAME           any vehicle command by wire name
/users              list connected users (USERS)
/connect            connect to the configured server
/disconnect         close the connection
/status             show telemetry panel
/quit               send BYE and exit
anything else       sent to the server as typed";

/// Parses one line of operator input.
pub fn parse_input(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Nothing;
    }
    let Some(shortcut) = line.strip_prefix('/') else {
        return ConsoleInput::Send(Command::raw(line));
    };

    let (verb, rest) = match shortcut.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (shortcut, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "hello" if !rest.is_empty() => ConsoleInput::Send(Command::hello(rest)),
        "hello" => ConsoleInput::Invalid("usage: /hello NAME".to_string()),
        "auth" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            match parts.next().filter(|u| !u.is_empty()) {
                Some(user) => {
                    let password = parts.next().unwrap_or("").trim();
                    ConsoleInput::Send(Command::auth(user, password))
                }
                None => ConsoleInput::Invalid("usage: /auth USER [PASS]".to_string()),
            }
        }
        "speed-up" => ConsoleInput::Send(Command::Vehicle(VehicleCommand::SpeedUp)),
        "slow-down" => ConsoleInput::Send(Command::Vehicle(VehicleCommand::SlowDown)),
        "left" => ConsoleInput::Send(Command::Vehicle(VehicleCommand::TurnLeft)),
        "right" => ConsoleInput::Send(Command::Vehicle(VehicleCommand::TurnRight)),
        "cmd" => match rest.parse::<VehicleCommand>() {
            Ok(cmd) => ConsoleInput::Send(Command::Vehicle(cmd)),
            Err(e) => ConsoleInput::Invalid(e.to_string()),
        },
        "users" => ConsoleInput::Send(Command::Users),
        "bye" => ConsoleInput::Send(Command::Bye),
        "connect" => ConsoleInput::Connect,
        "disconnect" => ConsoleInput::Disconnect,
        "status" => ConsoleInput::Status,
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        other => ConsoleInput::Invalid(format!("unknown shortcut /{other}; try /help")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent_raw() {
        assert_eq!(
            parse_input("  CMD SPEED_UP "),
            ConsoleInput::Send(Command::raw("CMD SPEED_UP"))
        );
    }

    #[test]
    fn test_blank_line_is_nothing() {
        assert_eq!(parse_input("   "), ConsoleInput::Nothing);
    }

    #[test]
    fn test_hello_shortcut() {
        assert_eq!(
            parse_input("/hello Ana"),
            ConsoleInput::Send(Command::hello("Ana"))
        );
        assert!(matches!(parse_input("/hello"), ConsoleInput::Invalid(_)));
    }

    #[test]
    fn test_auth_with_and_without_password() {
        assert_eq!(
            parse_input("/auth admin s3cret"),
            ConsoleInput::Send(Command::auth("admin", "s3cret"))
        );
        assert_eq!(
            parse_input("/auth admin"),
            ConsoleInput::Send(Command::auth("admin", ""))
        );
        assert!(matches!(parse_input("/auth"), ConsoleInput::Invalid(_)));
    }

    #[test]
    fn test_vehicle_shortcuts() {
        assert_eq!(
            parse_input("/LEFT"),
            ConsoleInput::Send(Command::Vehicle(VehicleCommand::TurnLeft))
        );
        assert_eq!(
            parse_input("/cmd slow_down"),
            ConsoleInput::Send(Command::Vehicle(VehicleCommand::SlowDown))
        );
        assert!(matches!(parse_input("/cmd hover"), ConsoleInput::Invalid(_)));
    }

    #[test]
    fn test_session_shortcuts() {
        assert_eq!(parse_input("/users"), ConsoleInput::Send(Command::Users));
        assert_eq!(parse_input("/connect"), ConsoleInput::Connect);
        assert_eq!(parse_input("/disconnect"), ConsoleInput::Disconnect);
        assert_eq!(parse_input("/quit"), ConsoleInput::Quit);
        assert!(matches!(parse_input("/fly"), ConsoleInput::Invalid(_)));
    }
}
