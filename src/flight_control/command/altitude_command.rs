use super::{
    base_command::{CommandStep, STABLE_TICKS_TO_SETTLE},
    deferred::CommandOutput,
};
use crate::flight_control::{common::MotionInstruction, drone_state::DroneState};

/// A purely vertical command, used for both take-off and landing.
///
/// The vehicle hovers towards `target` and the command completes once the
/// altitude error stays within `tolerance` for [`STABLE_TICKS_TO_SETTLE`]
/// consecutive ticks.
#[derive(Debug, Clone, Copy)]
pub struct AltitudeCommand {
    /// The altitude to reach.
    target: f64,
    /// Maximum accepted absolute altitude error.
    tolerance: f64,
    /// Consecutive ticks spent inside the tolerance band.
    stable_ticks: u8,
}

impl AltitudeCommand {
    pub fn new(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance, stable_ticks: 0 }
    }

    pub fn target(&self) -> f64 { self.target }
    pub fn stable_ticks(&self) -> u8 { self.stable_ticks }

    pub(super) fn update(&mut self, state: &DroneState) -> CommandStep {
        let altitude = state.altitude();
        let instruction = MotionInstruction::hover(self.target);
        if (altitude - self.target).abs() <= self.tolerance {
            self.stable_ticks = self.stable_ticks.saturating_add(1);
        } else {
            self.stable_ticks = 0;
        }
        if self.stable_ticks >= STABLE_TICKS_TO_SETTLE {
            let output = CommandOutput::Altitude { altitude, target: self.target };
            CommandStep::done(instruction, output)
        } else {
            CommandStep::running(instruction)
        }
    }
}
