use crate::warn;
use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    str::FromStr,
    time::Duration,
};

/// Runtime configuration of the pilot host, read from the environment.
#[derive(Debug, Clone)]
pub struct PilotConfig {
    /// Address the remote control console listens on.
    console_addr: SocketAddr,
    /// Simulation ticks per second.
    tick_hz: u32,
    /// Overall budget for missions that do not specify their own `timeoutMs`.
    mission_timeout: Duration,
}

impl PilotConfig {
    const CONSOLE_ADDR_VAR: &'static str = "PILOT_CONSOLE_ADDR";
    const TICK_HZ_VAR: &'static str = "PILOT_TICK_HZ";
    const MISSION_TIMEOUT_VAR: &'static str = "PILOT_MISSION_TIMEOUT_MS";

    const DEF_CONSOLE_ADDR: SocketAddr =
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 1337));
    const DEF_TICK_HZ: u32 = 60;
    const MAX_TICK_HZ: u32 = 1000;
    const DEF_MISSION_TIMEOUT_MS: u64 = 300_000;

    /// Builds the configuration from `PILOT_*` environment variables.
    ///
    /// Missing variables silently fall back to their defaults, malformed ones
    /// fall back with a warning.
    pub fn from_env() -> Self {
        let console_addr =
            Self::read_var(Self::CONSOLE_ADDR_VAR).unwrap_or(Self::DEF_CONSOLE_ADDR);
        let tick_hz = Self::read_var::<u32>(Self::TICK_HZ_VAR)
            .filter(|hz| (1..=Self::MAX_TICK_HZ).contains(hz))
            .unwrap_or(Self::DEF_TICK_HZ);
        let mission_timeout_ms =
            Self::read_var(Self::MISSION_TIMEOUT_VAR).unwrap_or(Self::DEF_MISSION_TIMEOUT_MS);
        Self {
            console_addr,
            tick_hz,
            mission_timeout: Duration::from_millis(mission_timeout_ms),
        }
    }

    fn read_var<T: FromStr>(name: &str) -> Option<T> {
        let raw = env::var(name).ok()?;
        if let Ok(val) = raw.trim().parse::<T>() {
            Some(val)
        } else {
            warn!("Ignoring malformed value {raw:?} for {name}, using default.");
            None
        }
    }

    pub fn console_addr(&self) -> SocketAddr { self.console_addr }
    pub fn tick_hz(&self) -> u32 { self.tick_hz }
    pub fn mission_timeout(&self) -> Duration { self.mission_timeout }

    /// Length of one simulation tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            console_addr: Self::DEF_CONSOLE_ADDR,
            tick_hz: Self::DEF_TICK_HZ,
            mission_timeout: Duration::from_millis(Self::DEF_MISSION_TIMEOUT_MS),
        }
    }
}
