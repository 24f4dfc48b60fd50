//! The tick-driven flight engine: commands, the controller scheduling them,
//! and the vehicle seam they drive.

pub mod command;
pub mod common;
mod controller_event;
mod drone_state;
mod flight_controller;
mod relative_frame;
mod vehicle;

pub use controller_event::ControllerEvent;
pub use drone_state::{ControllerState, DroneState};
pub use flight_controller::{ControlError, FlightController};
pub use relative_frame::RelativeFrame;
pub use vehicle::{MotionSource, NoManualInput, SimVehicle, Vehicle};
