use super::console_error::ConsoleError;
use crate::flight_control::{
    RelativeFrame,
    command::{CommandOptions, CommandResult},
};
use crate::mission_control::{MissionOptions, MissionProgress, Waypoint};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::Display;
use strum_macros::{Display, EnumString};

/// Correlation id chosen by the client, echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Num(u64),
    Text(String),
}

/// Client to server frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Upstream {
    Init {
        #[serde(default)]
        client: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    Ping {
        #[serde(rename = "requestId", default)]
        request_id: Option<RequestId>,
    },
    Command {
        #[serde(rename = "requestId", default)]
        request_id: Option<RequestId>,
        action: String,
        #[serde(default)]
        args: Value,
    },
    Query {
        #[serde(rename = "requestId", default)]
        request_id: Option<RequestId>,
        action: String,
    },
}

impl Upstream {
    const KNOWN_TYPES: [&'static str; 4] = ["init", "ping", "command", "query"];

    /// Decodes one frame.
    ///
    /// # Errors
    /// - The rejection to answer with, carrying the `requestId` if one could be recovered.
    pub fn decode(bytes: &[u8]) -> Result<Self, (Option<RequestId>, ConsoleError)> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| (None, ConsoleError::from(e)))?;
        let request_id = value
            .get("requestId")
            .and_then(|id| RequestId::deserialize(id).ok());
        let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
        if !Self::KNOWN_TYPES.contains(&kind) {
            return Err((request_id, ConsoleError::UnknownMessage(kind.to_string())));
        }
        serde_json::from_value(value).map_err(|e| (request_id, ConsoleError::from(e)))
    }
}

/// Server to client frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Downstream {
    Pong {
        #[serde(rename = "requestId")]
        request_id: Option<RequestId>,
    },
    Response {
        #[serde(rename = "requestId")]
        request_id: Option<RequestId>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Progress {
        action: String,
        current: usize,
        total: usize,
        waypoint: Waypoint,
    },
}

impl Downstream {
    pub fn ok(request_id: Option<RequestId>, result: Value) -> Self {
        Downstream::Response { request_id, ok: true, result: Some(result), error: None }
    }

    pub fn err(request_id: Option<RequestId>, error: &impl Display) -> Self {
        Downstream::Response { request_id, ok: false, result: None, error: Some(error.to_string()) }
    }

    /// Wraps a settled command outcome.
    pub fn outcome(request_id: Option<RequestId>, outcome: CommandResult) -> Self {
        match outcome.map(serde_json::to_value) {
            Ok(Ok(result)) => Self::ok(request_id, result),
            Ok(Err(err)) => Self::err(request_id, &err),
            Err(err) => Self::err(request_id, &err),
        }
    }
}

impl From<MissionProgress> for Downstream {
    fn from(progress: MissionProgress) -> Self {
        Downstream::Progress {
            action: String::from("mission"),
            current: progress.current,
            total: progress.total,
            waypoint: progress.waypoint,
        }
    }
}

/// Actions of a `command` frame.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum CommandAction {
    Hover,
    TakeOff,
    Land,
    MoveTo,
    MoveRelative,
    RotateYaw,
    Cancel,
    Pause,
    Resume,
    RunMission,
}

/// Actions of a `query` frame.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum QueryAction {
    GetState,
    IsActive,
}

#[derive(Debug, Deserialize)]
pub struct TakeOffArgs {
    pub altitude: f64,
    #[serde(default)]
    pub options: CommandOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct LandArgs {
    #[serde(default)]
    pub options: CommandOptions,
}

#[derive(Debug, Deserialize)]
pub struct MoveToArgs {
    pub x: f64,
    #[serde(default)]
    pub y: Option<f64>,
    pub z: f64,
    #[serde(default)]
    pub options: CommandOptions,
}

#[derive(Debug, Deserialize)]
pub struct MoveRelativeArgs {
    pub frame: RelativeFrame,
    #[serde(default)]
    pub forward: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub up: f64,
    #[serde(default)]
    pub options: CommandOptions,
}

#[derive(Debug, Deserialize)]
pub struct RotateYawArgs {
    pub angle: f64,
    #[serde(default)]
    pub options: CommandOptions,
}

#[derive(Debug, Deserialize)]
pub struct RunMissionArgs {
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub options: MissionOptions,
}

/// Decodes the `args` of a command, treating absent args as an empty object.
///
/// # Errors
/// - [`ConsoleError::InvalidArguments`] if `args` does not match `T`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ConsoleError> {
    if args.is_null() {
        return Ok(serde_json::from_value(Value::Object(serde_json::Map::new()))?);
    }
    Ok(serde_json::from_value(args)?)
}
