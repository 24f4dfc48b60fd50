#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod config;
mod console_communication;
mod flight_control;
mod keychain;
mod logger;
mod mission_control;

use crate::config::PilotConfig;
use crate::flight_control::{MotionSource, NoManualInput, SimVehicle, common::Vec3D};
use crate::keychain::Keychain;
use tokio::{
    sync::broadcast::error::RecvError,
    time::{Instant, MissedTickBehavior},
};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let config = PilotConfig::from_env();
    info!(
        "Starting pilot at {} Hz, console on {}.",
        config.tick_hz(),
        config.console_addr()
    );
    let keychain = Keychain::new(config, Box::new(SimVehicle::new(Vec3D::zero()))).await;
    if let Some(addr) = keychain.con().local_addr() {
        info!("Console listening on {addr}.");
    }

    let mut events = keychain.f_cont().read().await.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ev) => cmd!("{ev}"),
                Err(RecvError::Lagged(skipped)) => warn!("Event log skipped {skipped} event(s)."),
                Err(RecvError::Closed) => break,
            }
        }
    });

    run_ticks(&keychain, &mut NoManualInput).await;
}

/// Drives the controller at the configured tick rate.
///
/// Ticks in which no command drives the vehicle are handed to `manual`.
async fn run_ticks(keychain: &Keychain, manual: &mut dyn MotionSource) {
    let f_cont_lock = keychain.f_cont();
    let mut interval = tokio::time::interval(keychain.config().tick_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    loop {
        let now = interval.tick().await;
        let delta = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;

        let mut f_cont = f_cont_lock.write().await;
        let driven = f_cont.update(delta);
        if !driven {
            let position = f_cont.state().position();
            if let Some(instruction) = manual.next_instruction(position, delta) {
                f_cont.apply_external(instruction);
            }
        }
        f_cont.integrate(delta);
    }
}
