use super::{
    base_command::{CommandStep, STABLE_TICKS_TO_SETTLE},
    command_error::CommandError,
    command_options::CommandOptions,
    deferred::CommandOutput,
};
use crate::flight_control::{
    common::{MotionInstruction, Vec3D},
    drone_state::DroneState,
};
use serde::{Deserialize, Serialize};

/// A requested destination. A missing `y` means "keep the altitude the move starts at".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveTarget {
    pub x: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    pub z: f64,
}

impl MoveTarget {
    pub fn new(x: f64, y: Option<f64>, z: f64) -> Self { Self { x, y, z } }

    /// Resolves the target against the altitude the vehicle currently holds.
    pub fn resolve(&self, current_altitude: f64) -> Vec3D<f64> {
        Vec3D::new(self.x, self.y.unwrap_or(current_altitude), self.z)
    }
}

impl From<Vec3D<f64>> for MoveTarget {
    fn from(value: Vec3D<f64>) -> Self { Self::new(value.x(), Some(value.y()), value.z()) }
}

/// Flies to a point with a three-zone speed profile and settles with a debounced arrival check.
#[derive(Debug, Clone, Copy)]
pub struct MoveToCommand {
    requested: MoveTarget,
    /// Concrete target, fixed when the command starts.
    target: Option<Vec3D<f64>>,
    max_speed: f64,
    min_speed: f64,
    position_tolerance: f64,
    altitude_tolerance: f64,
    slowdown_distance: f64,
    stable_ticks: u8,
}

impl MoveToCommand {
    /// Fraction of the remaining distance that may be covered in a single tick.
    const OVERSHOOT_FACTOR: f64 = 0.8;
    /// Fraction of `min_speed` below which the commanded speed never drops.
    const SPEED_FLOOR_FACTOR: f64 = 0.8;

    pub fn new(requested: MoveTarget, options: &CommandOptions) -> Self {
        Self {
            requested,
            target: None,
            max_speed: options.max_speed(),
            min_speed: options.min_speed(),
            position_tolerance: options.position_tolerance(),
            altitude_tolerance: options.altitude_tolerance(),
            slowdown_distance: options.slowdown_distance(),
            stable_ticks: 0,
        }
    }

    pub fn requested(&self) -> MoveTarget { self.requested }
    pub fn target(&self) -> Option<Vec3D<f64>> { self.target }
    pub fn stable_ticks(&self) -> u8 { self.stable_ticks }

    pub(super) fn start(&mut self, state: &DroneState) {
        self.target = Some(self.requested.resolve(state.altitude()));
    }

    pub(super) fn update(
        &mut self,
        delta: f64,
        state: &DroneState,
    ) -> Result<CommandStep, CommandError> {
        let target = self
            .target
            .ok_or_else(|| CommandError::ExecutionFault("move updated before start".into()))?;
        let pos = state.position();
        let d = pos.horizontal_dist(&target);
        let dy = target.y() - pos.y();

        if d < self.position_tolerance && dy.abs() < self.altitude_tolerance {
            self.stable_ticks = self.stable_ticks.saturating_add(1);
            let instruction = MotionInstruction::hover(target.y());
            if self.stable_ticks >= STABLE_TICKS_TO_SETTLE {
                let output = CommandOutput::Position { position: pos, target };
                return Ok(CommandStep::done(instruction, output));
            }
            return Ok(CommandStep::running(instruction));
        }
        self.stable_ticks = 0;

        let angle = pos.heading_to(&target);
        let speed = self.speed_for(d, delta);
        Ok(CommandStep::running(MotionInstruction::travel(angle, speed, target.y())))
    }

    /// Speed profile over the remaining horizontal distance `d`.
    fn speed_for(&self, d: f64, delta: f64) -> f64 {
        let mut speed = if d < 2.0 * self.position_tolerance {
            self.min_speed
        } else if d < self.slowdown_distance {
            let ratio = d / self.slowdown_distance;
            self.min_speed + (self.max_speed - self.min_speed) * ratio
        } else {
            self.max_speed
        };
        if speed * delta > d && d > self.position_tolerance {
            speed = Self::OVERSHOOT_FACTOR * d / delta;
        }
        speed.max(Self::SPEED_FLOOR_FACTOR * self.min_speed)
    }
}
