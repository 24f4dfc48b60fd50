use super::common::{MotionInstruction, Vec3D};

/// The physical (or simulated) airframe a [`FlightController`](super::FlightController) drives.
///
/// The controller takes ownership of the vehicle on attach, so it is the only
/// party able to write instructions while it is active.
pub trait Vehicle: Send + Sync {
    /// Current position in world coordinates.
    fn position(&self) -> Vec3D<f64>;
    /// Current heading in radians, measured from +X towards +Z.
    fn heading(&self) -> f64;
    /// Latches `instruction` as the motion target until the next one arrives.
    fn apply(&mut self, instruction: MotionInstruction);
    /// Advances the vehicle's own dynamics by `delta` seconds.
    fn integrate(&mut self, _delta: f64) {}
}

/// Any non-autonomous producer of motion instructions (manual input, scripted drift, ...).
///
/// The host polls it only on ticks the controller did not drive.
pub trait MotionSource: Send {
    /// Returns the instruction for this tick, or `None` to leave the vehicle's latched target.
    fn next_instruction(&mut self, position: Vec3D<f64>, delta: f64) -> Option<MotionInstruction>;
}

/// A kinematic stand-in for an airframe.
///
/// Horizontal motion follows the latched instruction exactly; altitude
/// approaches its target with a bounded climb rate.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    position: Vec3D<f64>,
    heading: f64,
    climb_rate: f64,
    instruction: MotionInstruction,
}

impl SimVehicle {
    /// Default vertical speed in units per second.
    pub const DEF_CLIMB_RATE: f64 = 1.0;

    /// Creates a vehicle resting at `position`, holding its altitude.
    pub fn new(position: Vec3D<f64>) -> Self {
        Self {
            position,
            heading: 0.0,
            climb_rate: Self::DEF_CLIMB_RATE,
            instruction: MotionInstruction::hover(position.y()),
        }
    }

    #[must_use]
    pub fn with_climb_rate(mut self, climb_rate: f64) -> Self {
        self.climb_rate = climb_rate.abs();
        self
    }

    #[must_use]
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// The most recently applied instruction.
    pub fn instruction(&self) -> MotionInstruction { self.instruction }
}

impl Vehicle for SimVehicle {
    fn position(&self) -> Vec3D<f64> { self.position }

    fn heading(&self) -> f64 { self.heading }

    fn apply(&mut self, instruction: MotionInstruction) { self.instruction = instruction; }

    fn integrate(&mut self, delta: f64) {
        let (dx, dz) = if self.instruction.is_hover() {
            (0.0, 0.0)
        } else {
            let step = self.instruction.speed() * delta;
            let angle = self.instruction.angle();
            (angle.cos() * step, angle.sin() * step)
        };
        let dy = {
            let remaining = self.instruction.altitude() - self.position.y();
            let max_step = self.climb_rate * delta;
            remaining.clamp(-max_step, max_step)
        };
        self.position = self.position + Vec3D::new(dx, dy, dz);
    }
}

/// A [`MotionSource`] that never emits anything, leaving the vehicle on its latched target.
#[derive(Debug, Default)]
pub struct NoManualInput;

impl MotionSource for NoManualInput {
    fn next_instruction(&mut self, _: Vec3D<f64>, _: f64) -> Option<MotionInstruction> { None }
}
