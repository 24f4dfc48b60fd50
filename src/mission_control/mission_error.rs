use super::mission_state::MissionState;
use crate::flight_control::command::CommandError;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Terminal and per-waypoint failures of a mission run.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionError {
    /// The overall mission budget ran out.
    MissionTimeout { timeout: Duration },
    /// The mission was cancelled through [`Mission::cancel`](super::Mission::cancel).
    Cancelled,
    /// The command issued for waypoint `index` failed.
    WaypointFailed { index: usize, source: CommandError },
    /// Waypoint `index` lacks a parameter its type needs.
    InvalidWaypoint { index: usize, reason: &'static str },
    /// `run` was called on a mission that already ran.
    AlreadyStarted,
    /// `action` is not valid while the mission is in `state`.
    InvalidTransition { action: &'static str, state: MissionState },
}

impl MissionError {
    /// Whether the error ends the mission regardless of `continueOnError`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MissionError::MissionTimeout { .. } | MissionError::Cancelled)
    }
}

impl Display for MissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionError::MissionTimeout { timeout } => {
                write!(f, "mission timed out after {}ms", timeout.as_millis())
            }
            MissionError::Cancelled => write!(f, "mission cancelled"),
            MissionError::WaypointFailed { index, source } => {
                write!(f, "waypoint {index} failed: {source}")
            }
            MissionError::InvalidWaypoint { index, reason } => {
                write!(f, "waypoint {index} is invalid: {reason}")
            }
            MissionError::AlreadyStarted => write!(f, "mission already started"),
            MissionError::InvalidTransition { action, state } => {
                write!(f, "cannot {action} mission while {state}")
            }
        }
    }
}

impl std::error::Error for MissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MissionError::WaypointFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
