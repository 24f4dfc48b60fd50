//! Waypoint missions driving a shared
//! [`FlightController`](crate::flight_control::FlightController).

mod mission;
mod mission_error;
mod mission_state;
mod waypoint;

pub use mission::{Mission, MissionOptions, MissionProgress, MissionSummary, WaypointResult};
pub use mission_error::MissionError;
pub use mission_state::MissionState;
pub use waypoint::{Waypoint, WaypointError, WaypointKind};
