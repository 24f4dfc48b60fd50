use super::{
    altitude_command::AltitudeCommand,
    command_error::CommandError,
    command_options::CommandOptions,
    deferred::{CommandHandle, CommandOutput, CommandResult, Deferred},
    hover_command::HoverCommand,
    move_to_command::{MoveTarget, MoveToCommand},
    rotate_yaw_command::RotateYawCommand,
};
use crate::flight_control::{common::MotionInstruction, drone_state::DroneState};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use strum_macros::Display;

/// Number of consecutive in-tolerance ticks a positional command needs before it settles.
pub(crate) const STABLE_TICKS_TO_SETTLE: u8 = 2;

/// Unique, monotonically increasing identifier of an issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CommandId(pub(crate) u64);

impl Display for CommandId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// Discriminant of [`CommandKind`], used in events, logs and errors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Hover,
    TakeOff,
    Land,
    MoveTo,
    RotateYaw,
}

/// Lifecycle of a single command.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl CommandState {
    pub fn is_settled(self) -> bool {
        matches!(self, CommandState::Completed | CommandState::Failed | CommandState::Cancelled)
    }
}

/// The closed set of flight commands.
#[derive(Debug)]
pub enum CommandKind {
    Hover(HoverCommand),
    TakeOff(AltitudeCommand),
    Land(AltitudeCommand),
    MoveTo(MoveToCommand),
    RotateYaw(RotateYawCommand),
}

impl CommandKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandKind::Hover(_) => CommandType::Hover,
            CommandKind::TakeOff(_) => CommandType::TakeOff,
            CommandKind::Land(_) => CommandType::Land,
            CommandKind::MoveTo(_) => CommandType::MoveTo,
            CommandKind::RotateYaw(_) => CommandType::RotateYaw,
        }
    }
}

/// Result of advancing a command variant by one tick.
#[derive(Debug, Clone)]
pub(crate) struct CommandStep {
    instruction: MotionInstruction,
    done: Option<CommandOutput>,
}

impl CommandStep {
    pub(crate) fn running(instruction: MotionInstruction) -> Self {
        Self { instruction, done: None }
    }

    pub(crate) fn done(instruction: MotionInstruction, output: CommandOutput) -> Self {
        Self { instruction, done: Some(output) }
    }
}

/// A flight command together with its lifecycle bookkeeping and outcome.
#[derive(Debug)]
pub struct Command {
    id: CommandId,
    kind: CommandKind,
    state: CommandState,
    /// Simulated seconds spent in `update` since start.
    elapsed: f64,
    timeout: Option<Duration>,
    outcome: Deferred,
    /// The failure the outcome settled with, if any.
    error: Option<CommandError>,
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let details = match &self.kind {
            CommandKind::Hover(_) => String::from("hover"),
            CommandKind::TakeOff(c) => format!("take off to {:.3}", c.target()),
            CommandKind::Land(c) => format!("land at {:.3}", c.target()),
            CommandKind::MoveTo(c) => {
                let req = c.requested();
                let y = req.y.map_or_else(|| String::from("hold"), |y| format!("{y:.3}"));
                format!("move to [{:.3}, {y}, {:.3}]", req.x, req.z)
            }
            CommandKind::RotateYaw(c) => format!("rotate yaw to {:.3} rad", c.target_angle()),
        };
        write!(f, "{} ({details}, {})", self.id, self.state)
    }
}

impl Command {
    pub(crate) fn new(
        id: CommandId,
        kind: CommandKind,
        timeout: Option<Duration>,
    ) -> (Self, CommandHandle) {
        let (outcome, handle) = Deferred::new(id, kind.command_type());
        let cmd = Self {
            id,
            kind,
            state: CommandState::Pending,
            elapsed: 0.0,
            timeout,
            outcome,
            error: None,
        };
        (cmd, handle)
    }

    pub(crate) fn hover(id: CommandId) -> (Self, CommandHandle) {
        Self::new(id, CommandKind::Hover(HoverCommand::new()), None)
    }

    pub(crate) fn take_off(
        id: CommandId,
        altitude: f64,
        options: &CommandOptions,
    ) -> (Self, CommandHandle) {
        let kind =
            CommandKind::TakeOff(AltitudeCommand::new(altitude, options.altitude_tolerance()));
        Self::new(id, kind, options.timeout_or(Some(CommandOptions::DEF_TAKE_OFF_TIMEOUT)))
    }

    pub(crate) fn land(id: CommandId, options: &CommandOptions) -> (Self, CommandHandle) {
        let kind = CommandKind::Land(AltitudeCommand::new(
            options.ground_altitude(),
            options.altitude_tolerance(),
        ));
        Self::new(id, kind, options.timeout_or(Some(CommandOptions::DEF_LAND_TIMEOUT)))
    }

    pub(crate) fn move_to(
        id: CommandId,
        target: MoveTarget,
        options: &CommandOptions,
    ) -> (Self, CommandHandle) {
        let kind = CommandKind::MoveTo(MoveToCommand::new(target, options));
        Self::new(id, kind, options.timeout_or(Some(CommandOptions::DEF_MOVE_TO_TIMEOUT)))
    }

    pub(crate) fn rotate_yaw(
        id: CommandId,
        angle: f64,
        options: &CommandOptions,
    ) -> (Self, CommandHandle) {
        let kind = CommandKind::RotateYaw(RotateYawCommand::new(angle));
        Self::new(id, kind, options.timeout_or(None))
    }

    pub fn id(&self) -> CommandId { self.id }
    pub fn kind(&self) -> &CommandKind { &self.kind }
    pub fn command_type(&self) -> CommandType { self.kind.command_type() }
    pub fn state(&self) -> CommandState { self.state }
    pub fn elapsed(&self) -> f64 { self.elapsed }
    pub fn timeout(&self) -> Option<Duration> { self.timeout }
    pub fn is_settled(&self) -> bool { self.outcome.is_settled() }
    pub fn error(&self) -> Option<&CommandError> { self.error.as_ref() }

    /// Initializes variant targets from the current vehicle state and marks the command running.
    ///
    /// Hover and yaw requests complete right here.
    pub fn start(&mut self, state: &DroneState) {
        if self.state != CommandState::Pending {
            return;
        }
        self.state = CommandState::Running;
        self.elapsed = 0.0;
        let immediate = match &mut self.kind {
            CommandKind::Hover(c) => c.start(state),
            CommandKind::RotateYaw(c) => c.start(state),
            CommandKind::MoveTo(c) => {
                c.start(state);
                None
            }
            CommandKind::TakeOff(_) | CommandKind::Land(_) => None,
        };
        if let Some(output) = immediate {
            self.complete(output);
        }
    }

    /// Computes this tick's instruction.
    ///
    /// A timeout settles the command and yields a hover at the current
    /// altitude instead of the variant's instruction.
    ///
    /// # Errors
    /// - [`CommandError::ExecutionFault`] if the vehicle state or the computed
    ///   instruction is not usable. The command itself is left unsettled; the
    ///   caller decides how to report the fault.
    pub fn update(
        &mut self,
        delta: f64,
        state: &DroneState,
    ) -> Result<MotionInstruction, CommandError> {
        if !state.position().is_finite() || !state.heading().is_finite() {
            return Err(CommandError::ExecutionFault(format!(
                "vehicle reported non-finite state {}",
                state.position()
            )));
        }
        if !self.is_settled() {
            self.elapsed += delta.max(0.0);
            if let Some(timeout) = self.timeout {
                if self.elapsed > timeout.as_secs_f64() {
                    self.fail(CommandError::Timeout { command: self.command_type(), timeout });
                    return Ok(MotionInstruction::hover(state.altitude()));
                }
            }
        }
        let step = match &mut self.kind {
            CommandKind::Hover(c) => c.update(state),
            CommandKind::RotateYaw(c) => c.update(state),
            CommandKind::TakeOff(c) | CommandKind::Land(c) => c.update(state),
            CommandKind::MoveTo(c) => c.update(delta, state)?,
        };
        if !step.instruction.is_finite() {
            return Err(CommandError::ExecutionFault(format!(
                "{} produced non-finite instruction {}",
                self.command_type(),
                step.instruction
            )));
        }
        if let Some(output) = step.done {
            self.complete(output);
        }
        Ok(step.instruction)
    }

    /// Settles the outcome successfully. No-op if already settled.
    pub fn complete(&mut self, output: CommandOutput) -> bool {
        self.settle(Ok(output), CommandState::Completed)
    }

    /// Settles the outcome with `err`. No-op if already settled.
    pub fn fail(&mut self, err: CommandError) -> bool {
        let state = if err == CommandError::Cancelled {
            CommandState::Cancelled
        } else {
            CommandState::Failed
        };
        self.settle(Err(err), state)
    }

    /// Settles the outcome as cancelled. No-op if already settled.
    pub fn cancel(&mut self) -> bool { self.fail(CommandError::Cancelled) }

    fn settle(&mut self, result: CommandResult, state: CommandState) -> bool {
        if self.outcome.is_settled() {
            return false;
        }
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        self.state = state;
        self.outcome.settle(result)
    }
}
