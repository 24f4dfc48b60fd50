use serde::Serialize;
use std::fmt::{Display, Formatter};

/// A single low-level motion command applied to the vehicle for one tick.
///
/// When `hover` is set the vehicle holds its horizontal position and only
/// chases `altitude`. Otherwise `angle` (radians from +X towards +Z) and
/// `speed` describe the horizontal velocity. `altitude` is always a concrete
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionInstruction {
    hover: bool,
    angle: f64,
    speed: f64,
    altitude: f64,
}

impl MotionInstruction {
    /// Creates a hover instruction holding `altitude`.
    pub const fn hover(altitude: f64) -> Self {
        Self { hover: true, angle: 0.0, speed: 0.0, altitude }
    }

    /// Creates a horizontal motion instruction.
    ///
    /// Negative speeds are clamped to zero.
    pub fn travel(angle: f64, speed: f64, altitude: f64) -> Self {
        Self { hover: false, angle, speed: speed.max(0.0), altitude }
    }

    pub fn is_hover(&self) -> bool { self.hover }
    pub fn angle(&self) -> f64 { self.angle }
    pub fn speed(&self) -> f64 { self.speed }
    pub fn altitude(&self) -> f64 { self.altitude }

    /// Whether every numeric field is finite, i.e. the instruction is safe to apply.
    pub fn is_finite(&self) -> bool {
        self.angle.is_finite() && self.speed.is_finite() && self.altitude.is_finite()
    }
}

impl Display for MotionInstruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.hover {
            write!(f, "hover at {:.3}", self.altitude)
        } else {
            write!(
                f,
                "travel {:.3} rad at {:.3}/s, altitude {:.3}",
                self.angle, self.speed, self.altitude
            )
        }
    }
}
