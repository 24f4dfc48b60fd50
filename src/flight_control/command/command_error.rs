use super::base_command::CommandType;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Reasons a command's outcome settles as a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The command was still running when its simulated runtime exceeded the timeout.
    Timeout { command: CommandType, timeout: Duration },
    /// Explicit cancel, preemption by an immediate command, or a cancelled mission.
    Cancelled,
    /// Computing the command's instruction for a tick failed.
    ExecutionFault(String),
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Timeout { command, timeout } => {
                write!(f, "{command} timed out after {}ms", timeout.as_millis())
            }
            CommandError::Cancelled => write!(f, "command cancelled"),
            CommandError::ExecutionFault(reason) => write!(f, "execution fault: {reason}"),
        }
    }
}

impl std::error::Error for CommandError {}
