use crate::flight_control::command::CommandOptions;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// The controller operation a waypoint maps to.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum WaypointKind {
    MoveTo,
    TakeOff,
    Land,
    Hover,
}

/// Rejection of a waypoint while decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaypointError {
    UnknownType(String),
}

impl Display for WaypointError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WaypointError::UnknownType(kind) => write!(f, "unknown waypoint type {kind:?}"),
        }
    }
}

impl std::error::Error for WaypointError {}

/// Wire shape of a waypoint before its `type` is checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWaypoint {
    #[serde(rename = "type")]
    kind: String,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    altitude: Option<f64>,
    duration_ms: Option<u64>,
    options: Option<CommandOptions>,
}

/// One step of a mission.
///
/// Parameters are only checked against the waypoint type when the mission
/// dispatches it, so a mission with a malformed waypoint still runs the
/// waypoints before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWaypoint")]
pub struct Waypoint {
    #[serde(rename = "type")]
    kind: WaypointKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<CommandOptions>,
}

impl TryFrom<RawWaypoint> for Waypoint {
    type Error = WaypointError;

    fn try_from(raw: RawWaypoint) -> Result<Self, Self::Error> {
        let kind = WaypointKind::from_str(&raw.kind)
            .map_err(|_| WaypointError::UnknownType(raw.kind.clone()))?;
        Ok(Self {
            kind,
            x: raw.x,
            y: raw.y,
            z: raw.z,
            altitude: raw.altitude,
            duration_ms: raw.duration_ms,
            options: raw.options,
        })
    }
}

impl Waypoint {
    fn bare(kind: WaypointKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            z: None,
            altitude: None,
            duration_ms: None,
            options: None,
        }
    }

    pub fn take_off(altitude: f64) -> Self {
        Self { altitude: Some(altitude), ..Self::bare(WaypointKind::TakeOff) }
    }

    pub fn land() -> Self { Self::bare(WaypointKind::Land) }

    pub fn move_to(x: f64, y: Option<f64>, z: f64) -> Self {
        Self { x: Some(x), y, z: Some(z), ..Self::bare(WaypointKind::MoveTo) }
    }

    pub fn hover(duration: Duration) -> Self {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self { duration_ms: Some(duration_ms), ..Self::bare(WaypointKind::Hover) }
    }

    #[must_use]
    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn kind(&self) -> WaypointKind { self.kind }
    pub fn x(&self) -> Option<f64> { self.x }
    pub fn y(&self) -> Option<f64> { self.y }
    pub fn z(&self) -> Option<f64> { self.z }
    pub fn altitude(&self) -> Option<f64> { self.altitude }
    pub fn options(&self) -> CommandOptions { self.options.unwrap_or_default() }

    /// How long a hover waypoint holds after engaging; zero if unset.
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms.unwrap_or(0))
    }
}

impl Display for Waypoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let fmt_opt = |v: Option<f64>| v.map_or_else(|| String::from("-"), |v| format!("{v:.2}"));
        match self.kind {
            WaypointKind::MoveTo => write!(
                f,
                "moveTo [{}, {}, {}]",
                fmt_opt(self.x),
                fmt_opt(self.y),
                fmt_opt(self.z)
            ),
            WaypointKind::TakeOff => write!(f, "takeOff {}", fmt_opt(self.altitude)),
            WaypointKind::Land => write!(f, "land"),
            WaypointKind::Hover => write!(f, "hover {}ms", self.duration_ms.unwrap_or(0)),
        }
    }
}
