use super::{base_command::CommandStep, deferred::CommandOutput};
use crate::flight_control::{common::MotionInstruction, drone_state::DroneState};

/// Holds position at the altitude observed when the command starts.
///
/// Completes as soon as it starts; the controller still applies its hover
/// instruction for the tick it occupies.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoverCommand {
    altitude: Option<f64>,
}

impl HoverCommand {
    pub fn new() -> Self { Self::default() }

    pub(super) fn start(&mut self, state: &DroneState) -> Option<CommandOutput> {
        let altitude = state.altitude();
        self.altitude = Some(altitude);
        Some(CommandOutput::Hovering { altitude })
    }

    pub(super) fn update(&self, state: &DroneState) -> CommandStep {
        let altitude = self.altitude.unwrap_or_else(|| state.altitude());
        CommandStep::running(MotionInstruction::hover(altitude))
    }
}
