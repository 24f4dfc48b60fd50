use serde::Serialize;
use strum_macros::Display;

/// Lifecycle of a [`Mission`](super::Mission). Terminal states are never left.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionState {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl MissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionState::Completed | MissionState::Cancelled | MissionState::Failed)
    }
}
