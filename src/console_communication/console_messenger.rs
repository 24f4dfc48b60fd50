use super::{
    console_endpoint::{ConsoleEndpoint, ConsoleEvent},
    console_error::ConsoleError,
    console_messages::{
        CommandAction, Downstream, LandArgs, MoveRelativeArgs, MoveToArgs, QueryAction, RequestId,
        RotateYawArgs, RunMissionArgs, TakeOffArgs, Upstream, parse_args,
    },
};
use crate::flight_control::{
    ControllerState, FlightController,
    command::{CommandHandle, MoveTarget},
};
use crate::mission_control::{Mission, MissionOptions, Waypoint};
use crate::{error, event, info, log, warn};
use serde_json::{Value, json};
use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock, mpsc};

/// Turns console requests into controller and mission calls.
///
/// Replies are written to a downstream channel; [`ConsoleMessenger::start`]
/// connects that channel to a [`ConsoleEndpoint`], tests read it directly.
pub(crate) struct ConsoleMessenger {
    f_cont: Arc<RwLock<FlightController>>,
    mission: Mutex<Option<Arc<Mission>>>,
    mission_timeout: Duration,
    downstream: mpsc::UnboundedSender<Downstream>,
    local_addr: Option<SocketAddr>,
}

impl ConsoleMessenger {
    pub(crate) fn new(
        f_cont: Arc<RwLock<FlightController>>,
        mission_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Downstream>) {
        let (downstream, rx) = mpsc::unbounded_channel();
        let messenger = Self {
            f_cont,
            mission: Mutex::new(None),
            mission_timeout,
            downstream,
            local_addr: None,
        };
        (messenger, rx)
    }

    /// Listens on `addr` and serves console sessions until the process exits.
    ///
    /// # Errors
    /// - The bind error if the console endpoint cannot listen on `addr`.
    pub(crate) async fn start(
        addr: SocketAddr,
        f_cont: Arc<RwLock<FlightController>>,
        mission_timeout: Duration,
    ) -> Result<Arc<Self>, std::io::Error> {
        let (endpoint, mut receiver) = ConsoleEndpoint::start(addr).await?;
        let (mut inst, mut downstream_rx) = Self::new(f_cont, mission_timeout);
        inst.local_addr = Some(endpoint.local_addr());
        let messenger = Arc::new(inst);

        tokio::spawn(async move {
            while let Some(msg) = downstream_rx.recv().await {
                endpoint.send_downstream(&msg).await;
            }
        });

        let messenger_local = Arc::clone(&messenger);
        tokio::spawn(async move {
            while let Some(ev) = receiver.recv().await {
                match ev {
                    ConsoleEvent::Connected(peer) => info!("Console {peer} connected."),
                    ConsoleEvent::Disconnected(peer) => info!("Console {peer} disconnected."),
                    ConsoleEvent::Message(msg) => messenger_local.handle(msg).await,
                    ConsoleEvent::Rejected { request_id, reason } => {
                        if request_id.is_some() {
                            messenger_local.send(Downstream::err(request_id, &reason));
                        }
                    }
                }
            }
        });
        Ok(messenger)
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> { self.local_addr }

    /// Dispatches one upstream message.
    ///
    /// Queries and control actions are answered right away; flight commands
    /// and missions are answered from a spawned task once their outcome settles.
    pub(crate) async fn handle(&self, msg: Upstream) {
        match msg {
            Upstream::Init { client, version } => {
                info!(
                    "Console client {} {} initialized.",
                    client.as_deref().unwrap_or("<unnamed>"),
                    version.as_deref().unwrap_or("<unversioned>")
                );
            }
            Upstream::Ping { request_id: None } => event!("Console ping without id."),
            Upstream::Ping { request_id } => self.send(Downstream::Pong { request_id }),
            Upstream::Query { request_id, action } => {
                let result = self.query(&action).await;
                self.respond(request_id, result);
            }
            Upstream::Command { request_id, action, args } => {
                event!("Console command {action} ({request_id:?}).");
                if let Err(err) = self.command(request_id.clone(), &action, args).await {
                    self.respond(request_id, Err(err));
                }
            }
        }
    }

    async fn query(&self, action_name: &str) -> Result<Value, ConsoleError> {
        let action = QueryAction::from_str(action_name)
            .map_err(|_| ConsoleError::UnknownAction(action_name.to_string()))?;
        let f_cont = self.f_cont.read().await;
        match action {
            QueryAction::GetState => Ok(serde_json::to_value(f_cont.state())?),
            QueryAction::IsActive => Ok(Value::Bool(f_cont.is_active())),
        }
    }

    /// Executes a command action.
    ///
    /// # Errors
    /// - Rejections that have to be answered by the caller. On success the
    ///   response was either sent or handed to a task that sends it later.
    async fn command(
        &self,
        request_id: Option<RequestId>,
        action_name: &str,
        args: Value,
    ) -> Result<(), ConsoleError> {
        let action = CommandAction::from_str(action_name)
            .map_err(|_| ConsoleError::UnknownAction(action_name.to_string()))?;
        let handle = match action {
            CommandAction::Hover => self.f_cont.write().await.hover(),
            CommandAction::TakeOff => {
                let TakeOffArgs { altitude, options } = parse_args(args)?;
                self.f_cont.write().await.take_off(altitude, &options)
            }
            CommandAction::Land => {
                let LandArgs { options } = parse_args(args)?;
                self.f_cont.write().await.land(&options)
            }
            CommandAction::MoveTo => {
                let MoveToArgs { x, y, z, options } = parse_args(args)?;
                self.f_cont.write().await.move_to(MoveTarget::new(x, y, z), &options)
            }
            CommandAction::MoveRelative => {
                let MoveRelativeArgs { frame, forward, right, up, options } = parse_args(args)?;
                self.f_cont.write().await.move_relative(frame, (forward, right, up), &options)?
            }
            CommandAction::RotateYaw => {
                let RotateYawArgs { angle, options } = parse_args(args)?;
                self.f_cont.write().await.rotate_yaw(angle, &options)
            }
            CommandAction::Cancel => {
                let result = self.cancel().await;
                self.respond(request_id, Ok(result));
                return Ok(());
            }
            CommandAction::Pause | CommandAction::Resume => {
                let state = self.pause_or_resume(action).await?;
                self.respond(request_id, Ok(json!({ "controllerState": state })));
                return Ok(());
            }
            CommandAction::RunMission => {
                let RunMissionArgs { waypoints, options } = parse_args(args)?;
                return self.run_mission(request_id, waypoints, options).await;
            }
        };
        self.reply_on_settle(request_id, handle);
        Ok(())
    }

    fn reply_on_settle(&self, request_id: Option<RequestId>, handle: CommandHandle) {
        let downstream = self.downstream.clone();
        tokio::spawn(async move {
            let (id, command) = (handle.id(), handle.command());
            let outcome = handle.await;
            event!("Console {command} {id} settled: {outcome:?}");
            if request_id.is_some() {
                let _ = downstream.send(Downstream::outcome(request_id, outcome));
            }
        });
    }

    /// Cancels the active mission first, then whatever else the controller holds.
    async fn cancel(&self) -> Value {
        let mission = self.mission.lock().await.clone();
        let by_mission = match mission {
            Some(active) => active.cancel().await,
            None => None,
        };
        let cancelled = by_mission.unwrap_or(0) + self.f_cont.write().await.cancel();
        json!({ "cancelledCommands": cancelled, "missionCancelled": by_mission.is_some() })
    }

    /// Pauses or resumes the active mission, or the controller if no mission runs.
    async fn pause_or_resume(
        &self,
        action: CommandAction,
    ) -> Result<ControllerState, ConsoleError> {
        let mission = self.mission.lock().await.clone();
        match mission.filter(|m| !m.state().is_terminal()) {
            Some(active) if action == CommandAction::Pause => active.pause().await?,
            Some(active) => active.resume().await?,
            None if action == CommandAction::Pause => self.f_cont.write().await.pause()?,
            None => self.f_cont.write().await.resume()?,
        }
        Ok(self.f_cont.read().await.controller_state())
    }

    async fn run_mission(
        &self,
        request_id: Option<RequestId>,
        waypoints: Vec<Waypoint>,
        options: MissionOptions,
    ) -> Result<(), ConsoleError> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let mission = {
            let mut slot = self.mission.lock().await;
            if slot.as_ref().is_some_and(|m| !m.state().is_terminal()) {
                return Err(ConsoleError::MissionBusy);
            }
            let mission = Arc::new(
                Mission::new(Arc::clone(&self.f_cont), waypoints, options, self.mission_timeout)
                    .with_progress(progress_tx),
            );
            *slot = Some(Arc::clone(&mission));
            mission
        };
        log!("Console started a mission with {} waypoint(s).", mission.waypoints().len());

        let downstream = self.downstream.clone();
        tokio::spawn(async move {
            let run = mission.run();
            tokio::pin!(run);
            let result = loop {
                tokio::select! {
                    res = &mut run => break res,
                    Some(progress) = progress_rx.recv() => {
                        let _ = downstream.send(Downstream::from(progress));
                    }
                }
            };
            while let Ok(progress) = progress_rx.try_recv() {
                let _ = downstream.send(Downstream::from(progress));
            }
            let response = match result {
                Ok(summary) => match serde_json::to_value(summary) {
                    Ok(value) => Downstream::ok(request_id, value),
                    Err(err) => Downstream::err(request_id, &err),
                },
                Err(err) => Downstream::err(request_id, &err),
            };
            let _ = downstream.send(response);
        });
        Ok(())
    }

    fn respond(&self, request_id: Option<RequestId>, result: Result<Value, ConsoleError>) {
        match (request_id, result) {
            (Some(id), Ok(value)) => self.send(Downstream::ok(Some(id), value)),
            (Some(id), Err(err)) => self.send(Downstream::err(Some(id), &err)),
            (None, Err(err)) => warn!("Console request without id failed: {err}"),
            (None, Ok(_)) => {}
        }
    }

    fn send(&self, msg: Downstream) {
        if self.downstream.send(msg).is_err() {
            error!("Console downstream closed.");
        }
    }
}
