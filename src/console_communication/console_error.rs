use crate::flight_control::{ControlError, command::CommandError};
use crate::mission_control::MissionError;
use std::fmt::{Display, Formatter};

/// Failures of a console request. Every variant ends up as `{ok: false, error}`
/// on the wire; none of them closes the session.
#[derive(Debug)]
pub enum ConsoleError {
    /// The `action` of a command or query is not known.
    UnknownAction(String),
    /// The frame's `type` is missing or not known.
    UnknownMessage(String),
    /// The frame or the action's `args` do not decode.
    InvalidArguments(String),
    /// `run_mission` while another mission has not finished.
    MissionBusy,
    Control(ControlError),
    Command(CommandError),
    Mission(MissionError),
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::UnknownAction(action) => write!(f, "unknown action {action:?}"),
            ConsoleError::UnknownMessage(kind) => write!(f, "unknown message type {kind:?}"),
            ConsoleError::InvalidArguments(reason) => write!(f, "invalid arguments: {reason}"),
            ConsoleError::MissionBusy => write!(f, "another mission is still running"),
            ConsoleError::Control(err) => write!(f, "{err}"),
            ConsoleError::Command(err) => write!(f, "{err}"),
            ConsoleError::Mission(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Control(err) => Some(err),
            ConsoleError::Command(err) => Some(err),
            ConsoleError::Mission(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(value: serde_json::Error) -> Self { ConsoleError::InvalidArguments(value.to_string()) }
}

impl From<ControlError> for ConsoleError {
    fn from(value: ControlError) -> Self { ConsoleError::Control(value) }
}

impl From<CommandError> for ConsoleError {
    fn from(value: CommandError) -> Self { ConsoleError::Command(value) }
}

impl From<MissionError> for ConsoleError {
    fn from(value: MissionError) -> Self { ConsoleError::Mission(value) }
}
