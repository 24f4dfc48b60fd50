use crate::config::PilotConfig;
use crate::console_communication::ConsoleMessenger;
use crate::flight_control::{FlightController, Vehicle};
use crate::fatal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The long-lived components of the pilot host, shared between the tick loop
/// and the console.
#[derive(Clone)]
pub struct Keychain {
    /// The flight controller scheduling commands onto the attached vehicle.
    f_cont: Arc<RwLock<FlightController>>,
    /// The console messenger serving remote sessions.
    con: Arc<ConsoleMessenger>,
    /// Runtime configuration the components were built from.
    config: Arc<PilotConfig>,
}

impl Keychain {
    /// Builds the controller around `vehicle` and starts the console.
    ///
    /// Terminates the process if the console address cannot be bound.
    pub async fn new(config: PilotConfig, vehicle: Box<dyn Vehicle>) -> Self {
        let mut controller = FlightController::new();
        controller.attach(vehicle);
        let f_cont = Arc::new(RwLock::new(controller));
        let con = ConsoleMessenger::start(
            config.console_addr(),
            Arc::clone(&f_cont),
            config.mission_timeout(),
        )
        .await
        .unwrap_or_else(|e| fatal!("Console could not listen on {}: {e}", config.console_addr()));
        Self { f_cont, con, config: Arc::new(config) }
    }

    /// Provides a cloned reference to the flight controller.
    pub fn f_cont(&self) -> Arc<RwLock<FlightController>> { Arc::clone(&self.f_cont) }

    /// Provides a cloned reference to the console messenger.
    pub fn con(&self) -> Arc<ConsoleMessenger> { Arc::clone(&self.con) }

    pub fn config(&self) -> &PilotConfig { &self.config }
}
