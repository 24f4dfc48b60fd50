use super::{base_command::CommandStep, deferred::CommandOutput};
use crate::flight_control::{common::MotionInstruction, drone_state::DroneState};

/// Requests a heading change.
///
/// The request is acknowledged on start without corrective motion: the
/// vehicle keeps its heading and hovers at the start altitude.
// TODO: drive the heading once `Vehicle` exposes a yaw-rate input.
#[derive(Debug, Clone, Copy)]
pub struct RotateYawCommand {
    target_angle: f64,
    hold_altitude: Option<f64>,
}

impl RotateYawCommand {
    pub fn new(target_angle: f64) -> Self { Self { target_angle, hold_altitude: None } }

    pub fn target_angle(&self) -> f64 { self.target_angle }

    pub(super) fn start(&mut self, state: &DroneState) -> Option<CommandOutput> {
        self.hold_altitude = Some(state.altitude());
        Some(CommandOutput::Heading { angle: self.target_angle })
    }

    pub(super) fn update(&self, state: &DroneState) -> CommandStep {
        let altitude = self.hold_altitude.unwrap_or_else(|| state.altitude());
        CommandStep::running(MotionInstruction::hover(altitude))
    }
}
