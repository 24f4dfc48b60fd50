use super::{
    mission_error::MissionError,
    mission_state::MissionState,
    waypoint::{Waypoint, WaypointKind},
};
use crate::flight_control::{
    ControllerState, FlightController,
    command::{CommandError, CommandHandle, CommandOutput, MoveTarget},
};
use crate::{error, info, log, warn};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, RwLock, mpsc, watch},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

/// Run-wide settings of a mission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissionOptions {
    /// Record failed waypoints and keep going instead of failing the mission.
    pub continue_on_error: bool,
    /// Overall budget from mission start; `0` disables it.
    pub timeout_ms: Option<u64>,
}

/// Record of one dispatched waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointResult {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WaypointResult {
    fn success(index: usize, output: CommandOutput) -> Self {
        Self { index, success: true, result: Some(output), error: None }
    }

    fn failure(index: usize, err: &MissionError) -> Self {
        Self { index, success: false, result: None, error: Some(err.to_string()) }
    }
}

/// Outcome of a finished mission run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSummary {
    pub waypoints_completed: usize,
    pub waypoints_total: usize,
    pub results: Vec<WaypointResult>,
}

/// Emitted right before a waypoint is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionProgress {
    /// Zero-based index of the waypoint about to run.
    pub current: usize,
    pub total: usize,
    pub waypoint: Waypoint,
}

/// Runs a list of waypoints one after another against a shared controller.
///
/// A mission only talks to the [`FlightController`] through its public
/// operations and never holds the controller lock across an `.await`, so the
/// host tick loop keeps driving the vehicle while the mission waits on
/// command outcomes.
pub struct Mission {
    f_cont: Arc<RwLock<FlightController>>,
    waypoints: Vec<Waypoint>,
    options: MissionOptions,
    timeout: Option<Duration>,
    state: watch::Sender<MissionState>,
    c_tok: CancellationToken,
    results: Mutex<Vec<WaypointResult>>,
    progress_tx: Option<mpsc::UnboundedSender<MissionProgress>>,
}

impl Mission {
    /// Overall budget when neither the mission nor the host configures one.
    pub const DEF_TIMEOUT: Duration = Duration::from_secs(300);

    /// Creates a pending mission.
    ///
    /// # Arguments
    /// * `f_cont` - The controller the waypoints are issued to.
    /// * `waypoints` - The ordered steps of the mission.
    /// * `options` - Run-wide settings; `timeoutMs` overrides `default_timeout`.
    /// * `default_timeout` - Overall budget used when `options` carries none.
    pub fn new(
        f_cont: Arc<RwLock<FlightController>>,
        waypoints: Vec<Waypoint>,
        options: MissionOptions,
        default_timeout: Duration,
    ) -> Self {
        let timeout = match options.timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(default_timeout),
        };
        let (state, _) = watch::channel(MissionState::Pending);
        Self {
            f_cont,
            waypoints,
            options,
            timeout,
            state,
            c_tok: CancellationToken::new(),
            results: Mutex::new(Vec::new()),
            progress_tx: None,
        }
    }

    /// Streams a [`MissionProgress`] for every dispatched waypoint into `tx`.
    #[must_use]
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<MissionProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn state(&self) -> MissionState { *self.state.borrow() }
    pub fn subscribe_state(&self) -> watch::Receiver<MissionState> { self.state.subscribe() }
    pub fn waypoints(&self) -> &[Waypoint] { &self.waypoints }
    pub fn timeout(&self) -> Option<Duration> { self.timeout }

    /// Returns the waypoint results recorded so far.
    pub async fn results(&self) -> Vec<WaypointResult> { self.results.lock().await.clone() }

    pub async fn summary(&self) -> MissionSummary {
        let results = self.results().await;
        MissionSummary {
            waypoints_completed: results.iter().filter(|r| r.success).count(),
            waypoints_total: self.waypoints.len(),
            results,
        }
    }

    /// Runs the mission to a terminal state.
    ///
    /// # Errors
    /// - [`MissionError::AlreadyStarted`] if the mission ran before.
    /// - [`MissionError::Cancelled`] if the mission was cancelled before or while running.
    /// - [`MissionError::MissionTimeout`] if the overall budget ran out.
    /// - The first waypoint failure, unless `continueOnError` is set.
    pub async fn run(&self) -> Result<MissionSummary, MissionError> {
        let mut prior = MissionState::Pending;
        let started = self.state.send_if_modified(|state| {
            prior = *state;
            if *state == MissionState::Pending {
                *state = MissionState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(if prior == MissionState::Cancelled {
                MissionError::Cancelled
            } else {
                MissionError::AlreadyStarted
            });
        }

        let total = self.waypoints.len();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        info!("Mission started with {total} waypoint(s).");

        for (index, waypoint) in self.waypoints.iter().enumerate() {
            if let Err(err) = self.wait_while_paused(deadline).await {
                return self.abort(err).await;
            }
            if self.c_tok.is_cancelled() {
                return self.abort(MissionError::Cancelled).await;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return self.abort(self.timeout_error()).await;
            }

            log!("Mission waypoint {}/{total}: {waypoint}.", index + 1);
            self.report_progress(index, waypoint);
            match self.execute(index, waypoint, deadline).await {
                Ok(output) => {
                    self.results.lock().await.push(WaypointResult::success(index, output));
                }
                Err(err) if err.is_fatal() => {
                    self.results.lock().await.push(WaypointResult::failure(index, &err));
                    return self.abort(err).await;
                }
                Err(err) => {
                    self.results.lock().await.push(WaypointResult::failure(index, &err));
                    if !self.options.continue_on_error {
                        return self.abort(err).await;
                    }
                    warn!("{err}, continuing.");
                }
            }
        }

        self.finish(MissionState::Completed);
        let summary = self.summary().await;
        let outcomes = summary
            .results
            .iter()
            .map(|r| format!("{}:{}", r.index, if r.success { "ok" } else { "failed" }))
            .join(", ");
        info!(
            "Mission completed {}/{} waypoint(s) [{outcomes}].",
            summary.waypoints_completed, summary.waypoints_total
        );
        Ok(summary)
    }

    /// Cancels the mission and everything in flight on the controller.
    ///
    /// The mission is marked cancelled before the controller drops its
    /// commands, so the runner never mistakes the dropped waypoint for a
    /// waypoint failure.
    ///
    /// # Returns
    /// - The number of controller commands this call cancelled, or `None` if
    ///   the mission had already reached a terminal state.
    pub async fn cancel(&self) -> Option<usize> {
        if self.state().is_terminal() {
            return None;
        }
        self.c_tok.cancel();
        let settled = self.f_cont.write().await.cancel();
        // The runner may have observed the token and finished first.
        let cancelled =
            self.finish(MissionState::Cancelled) || self.state() == MissionState::Cancelled;
        if !cancelled {
            return None;
        }
        info!("Mission cancelled, {settled} command(s) dropped.");
        Some(settled)
    }

    /// Pauses the mission and, if it is running, the controller.
    ///
    /// # Errors
    /// - [`MissionError::InvalidTransition`] unless the mission is running.
    pub async fn pause(&self) -> Result<(), MissionError> {
        self.transition("pause", MissionState::Running, MissionState::Paused)?;
        let mut f_cont = self.f_cont.write().await;
        if f_cont.controller_state() == ControllerState::Running {
            if let Err(err) = f_cont.pause() {
                warn!("Mission paused but controller did not: {err}");
            }
        }
        info!("Mission paused.");
        Ok(())
    }

    /// Resumes a paused mission and, if it is paused, the controller.
    ///
    /// # Errors
    /// - [`MissionError::InvalidTransition`] unless the mission is paused.
    pub async fn resume(&self) -> Result<(), MissionError> {
        self.transition("resume", MissionState::Paused, MissionState::Running)?;
        let mut f_cont = self.f_cont.write().await;
        if f_cont.controller_state() == ControllerState::Paused {
            if let Err(err) = f_cont.resume() {
                warn!("Mission resumed but controller did not: {err}");
            }
        }
        info!("Mission resumed.");
        Ok(())
    }

    async fn execute(
        &self,
        index: usize,
        waypoint: &Waypoint,
        deadline: Option<Instant>,
    ) -> Result<CommandOutput, MissionError> {
        let handle = self.dispatch(index, waypoint).await?;
        let output = self
            .race(handle, deadline)
            .await?
            .map_err(|source| {
                if source == CommandError::Cancelled && self.c_tok.is_cancelled() {
                    MissionError::Cancelled
                } else {
                    MissionError::WaypointFailed { index, source }
                }
            })?;
        let hold = waypoint.hold_duration();
        if waypoint.kind() == WaypointKind::Hover && !hold.is_zero() {
            self.race(tokio::time::sleep(hold), deadline).await?;
        }
        Ok(output)
    }

    async fn dispatch(
        &self,
        index: usize,
        waypoint: &Waypoint,
    ) -> Result<CommandHandle, MissionError> {
        let options = waypoint.options();
        let mut f_cont = self.f_cont.write().await;
        match waypoint.kind() {
            WaypointKind::TakeOff => {
                let altitude = waypoint.altitude().ok_or(MissionError::InvalidWaypoint {
                    index,
                    reason: "takeOff requires altitude",
                })?;
                Ok(f_cont.take_off(altitude, &options))
            }
            WaypointKind::Land => Ok(f_cont.land(&options)),
            WaypointKind::MoveTo => {
                let (Some(x), Some(z)) = (waypoint.x(), waypoint.z()) else {
                    return Err(MissionError::InvalidWaypoint {
                        index,
                        reason: "moveTo requires x and z",
                    });
                };
                Ok(f_cont.move_to(MoveTarget::new(x, waypoint.y(), z), &options))
            }
            WaypointKind::Hover => Ok(f_cont.hover()),
        }
    }

    /// Awaits `fut` unless the mission is cancelled or its deadline passes first.
    async fn race<F: Future>(
        &self,
        fut: F,
        deadline: Option<Instant>,
    ) -> Result<F::Output, MissionError> {
        tokio::select! {
            biased;
            () = self.c_tok.cancelled() => Err(MissionError::Cancelled),
            () = Self::deadline_passed(deadline) => Err(self.timeout_error()),
            out = fut => Ok(out),
        }
    }

    async fn wait_while_paused(&self, deadline: Option<Instant>) -> Result<(), MissionError> {
        let mut state_rx = self.state.subscribe();
        self.race(
            async move {
                // The sender lives in `self`, so the channel cannot close here.
                let _ = state_rx.wait_for(|s| *s != MissionState::Paused).await;
            },
            deadline,
        )
        .await
    }

    async fn deadline_passed(deadline: Option<Instant>) {
        match deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending().await,
        }
    }

    fn timeout_error(&self) -> MissionError {
        MissionError::MissionTimeout { timeout: self.timeout.unwrap_or(Duration::ZERO) }
    }

    fn report_progress(&self, index: usize, waypoint: &Waypoint) {
        if let Some(tx) = &self.progress_tx {
            let progress = MissionProgress {
                current: index,
                total: self.waypoints.len(),
                waypoint: waypoint.clone(),
            };
            // A gone listener does not stop the mission.
            let _ = tx.send(progress);
        }
    }

    /// Ends the run with `err`, stopping whatever the controller still does.
    async fn abort(&self, err: MissionError) -> Result<MissionSummary, MissionError> {
        let terminal = if err == MissionError::Cancelled {
            MissionState::Cancelled
        } else {
            self.f_cont.write().await.cancel();
            MissionState::Failed
        };
        if self.finish(terminal) {
            error!("Mission {terminal}: {err}");
        }
        Err(err)
    }

    /// Moves to a terminal state unless one was already reached.
    fn finish(&self, terminal: MissionState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = terminal;
                true
            }
        })
    }

    fn transition(
        &self,
        action: &'static str,
        from: MissionState,
        to: MissionState,
    ) -> Result<(), MissionError> {
        let mut current = from;
        let moved = self.state.send_if_modified(|state| {
            current = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if moved { Ok(()) } else { Err(MissionError::InvalidTransition { action, state: current }) }
    }
}
