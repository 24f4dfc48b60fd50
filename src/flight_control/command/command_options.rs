use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-call tuning overrides for flight commands.
///
/// Every field is optional; unset fields resolve to the defaults below.
/// On the wire the keys are camelCase (`timeoutMs`, `maxSpeed`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOptions {
    /// Timeout in milliseconds; `0` disables the timeout.
    pub timeout_ms: Option<u64>,
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
    pub position_tolerance: Option<f64>,
    pub altitude_tolerance: Option<f64>,
    pub slowdown_distance: Option<f64>,
    pub ground_altitude: Option<f64>,
}

impl CommandOptions {
    pub const DEF_MAX_SPEED: f64 = 0.3;
    pub const DEF_MIN_SPEED: f64 = 0.05;
    pub const DEF_POSITION_TOLERANCE: f64 = 0.05;
    pub const DEF_ALTITUDE_TOLERANCE: f64 = 0.05;
    pub const DEF_SLOWDOWN_DISTANCE: f64 = 0.5;
    pub const DEF_GROUND_ALTITUDE: f64 = 0.0;

    pub const DEF_TAKE_OFF_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEF_LAND_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEF_MOVE_TO_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn max_speed(&self) -> f64 { self.max_speed.unwrap_or(Self::DEF_MAX_SPEED).abs() }

    /// Minimum cruise speed, never above [`Self::max_speed`].
    pub fn min_speed(&self) -> f64 {
        self.min_speed.unwrap_or(Self::DEF_MIN_SPEED).abs().min(self.max_speed())
    }

    pub fn position_tolerance(&self) -> f64 {
        self.position_tolerance.unwrap_or(Self::DEF_POSITION_TOLERANCE).abs()
    }

    pub fn altitude_tolerance(&self) -> f64 {
        self.altitude_tolerance.unwrap_or(Self::DEF_ALTITUDE_TOLERANCE).abs()
    }

    pub fn slowdown_distance(&self) -> f64 {
        self.slowdown_distance.unwrap_or(Self::DEF_SLOWDOWN_DISTANCE).abs()
    }

    pub fn ground_altitude(&self) -> f64 {
        self.ground_altitude.unwrap_or(Self::DEF_GROUND_ALTITUDE)
    }

    /// Resolves the effective timeout, falling back to `default` when unset.
    ///
    /// # Returns
    /// - `None` if the timeout is disabled (explicit `0`, or no default).
    pub fn timeout_or(&self, default: Option<Duration>) -> Option<Duration> {
        match self.timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => default,
        }
    }
}
