use super::common::Vec3D;
use serde::Serialize;
use strum_macros::Display;

/// Scheduling state of a [`FlightController`](super::FlightController).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Idle,
    Running,
    Paused,
}

/// Read-only view of the vehicle and controller, handed to commands every tick
/// and returned by state queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneState {
    position: Vec3D<f64>,
    heading_radians: f64,
    is_active: bool,
    queue_length: usize,
    controller_state: ControllerState,
}

impl DroneState {
    pub fn new(
        position: Vec3D<f64>,
        heading_radians: f64,
        is_active: bool,
        queue_length: usize,
        controller_state: ControllerState,
    ) -> Self {
        Self { position, heading_radians, is_active, queue_length, controller_state }
    }

    pub fn position(&self) -> Vec3D<f64> { self.position }
    pub fn altitude(&self) -> f64 { self.position.y() }
    pub fn heading(&self) -> f64 { self.heading_radians }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn queue_length(&self) -> usize { self.queue_length }
    pub fn controller_state(&self) -> ControllerState { self.controller_state }
}
