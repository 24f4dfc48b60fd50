//! Flight commands: the closed set of intents a [`FlightController`](super::FlightController)
//! turns into per-tick motion instructions, plus their single-assignment outcomes.

mod altitude_command;
mod base_command;
mod command_error;
mod command_options;
mod deferred;
mod hover_command;
mod move_to_command;
mod rotate_yaw_command;

pub use altitude_command::AltitudeCommand;
pub use base_command::{Command, CommandId, CommandKind, CommandState, CommandType};
pub use command_error::CommandError;
pub use command_options::CommandOptions;
pub use deferred::{CommandHandle, CommandOutput, CommandResult};
pub use hover_command::HoverCommand;
pub use move_to_command::{MoveTarget, MoveToCommand};
pub use rotate_yaw_command::RotateYawCommand;
