use super::{
    command::{CommandError, CommandId, CommandType},
    drone_state::ControllerState,
};
use std::fmt::{Display, Formatter};

/// Lifecycle notifications published by a [`FlightController`](super::FlightController).
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    CommandStarted { id: CommandId, command: CommandType },
    CommandCompleted { id: CommandId, command: CommandType },
    CommandFailed { id: CommandId, command: CommandType, error: CommandError },
    StateChanged { from: ControllerState, to: ControllerState },
}

impl Display for ControllerEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerEvent::CommandStarted { id, command } => write!(f, "{command} {id} started"),
            ControllerEvent::CommandCompleted { id, command } => {
                write!(f, "{command} {id} completed")
            }
            ControllerEvent::CommandFailed { id, command, error } => {
                write!(f, "{command} {id} failed: {error}")
            }
            ControllerEvent::StateChanged { from, to } => write!(f, "controller {from} -> {to}"),
        }
    }
}
