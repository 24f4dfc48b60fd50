use super::{
    command::{
        Command, CommandError, CommandHandle, CommandId, CommandOptions, CommandState, MoveTarget,
    },
    common::{MotionInstruction, Vec3D},
    controller_event::ControllerEvent,
    drone_state::{ControllerState, DroneState},
    relative_frame::RelativeFrame,
    vehicle::Vehicle,
};
use crate::{cmd, error, event, info, warn};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use tokio::sync::broadcast;

/// Misuse of the controller's control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// `action` is not valid while the controller is in `state`.
    InvalidTransition { action: &'static str, state: ControllerState },
    /// The operation needs the vehicle pose but no vehicle is attached.
    NoVehicle,
}

impl Display for ControlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::InvalidTransition { action, state } => {
                write!(f, "cannot {action} while controller is {state}")
            }
            ControlError::NoVehicle => write!(f, "no vehicle attached"),
        }
    }
}

impl std::error::Error for ControlError {}

/// Turns flight intents into one motion instruction per tick.
///
/// Holds a FIFO queue of pending [`Command`]s and at most one current command.
/// While it is active the controller is the only writer of motion
/// instructions: it owns the [`Vehicle`], and other sources have to go through
/// [`FlightController::apply_external`].
pub struct FlightController {
    state: ControllerState,
    current: Option<Command>,
    queue: VecDeque<Command>,
    paused: bool,
    vehicle: Option<Box<dyn Vehicle>>,
    next_id: u64,
    event_hub: broadcast::Sender<ControllerEvent>,
}

impl FlightController {
    const EVENT_HUB_CAPACITY: usize = 64;

    pub fn new() -> Self {
        let (event_hub, _) = broadcast::channel(Self::EVENT_HUB_CAPACITY);
        Self {
            state: ControllerState::Idle,
            current: None,
            queue: VecDeque::new(),
            paused: false,
            vehicle: None,
            next_id: 1,
            event_hub,
        }
    }

    /// Attaches `vehicle`, returning the previously attached one.
    ///
    /// Commands issued before attaching start on the first tick after.
    pub fn attach(&mut self, vehicle: Box<dyn Vehicle>) -> Option<Box<dyn Vehicle>> {
        info!("Vehicle attached at {}.", vehicle.position());
        self.vehicle.replace(vehicle)
    }

    /// Cancels everything in flight and hands the vehicle back.
    pub fn detach(&mut self) -> Option<Box<dyn Vehicle>> {
        self.cancel();
        let vehicle = self.vehicle.take();
        if vehicle.is_some() {
            info!("Vehicle detached.");
        }
        vehicle
    }

    pub fn has_vehicle(&self) -> bool { self.vehicle.is_some() }

    /// Subscribes to command and state notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> { self.event_hub.subscribe() }

    /// Hovers in place, preempting everything in flight.
    pub fn hover(&mut self) -> CommandHandle {
        let id = self.next_id();
        self.execute_immediate(Command::hover(id))
    }

    pub fn take_off(&mut self, altitude: f64, options: &CommandOptions) -> CommandHandle {
        let id = self.next_id();
        self.enqueue(Command::take_off(id, altitude, options))
    }

    pub fn land(&mut self, options: &CommandOptions) -> CommandHandle {
        let id = self.next_id();
        self.enqueue(Command::land(id, options))
    }

    pub fn move_to(&mut self, target: MoveTarget, options: &CommandOptions) -> CommandHandle {
        let id = self.next_id();
        self.enqueue(Command::move_to(id, target, options))
    }

    /// Moves by an offset relative to the vehicle pose at the time of the call.
    ///
    /// # Errors
    /// - [`ControlError::NoVehicle`] if there is no pose to move relative to.
    pub fn move_relative(
        &mut self,
        frame: RelativeFrame,
        (forward, right, up): (f64, f64, f64),
        options: &CommandOptions,
    ) -> Result<CommandHandle, ControlError> {
        let vehicle = self.vehicle.as_ref().ok_or(ControlError::NoVehicle)?;
        let target = frame.resolve(vehicle.position(), vehicle.heading(), forward, right, up);
        event!("Relative move ({frame}) {forward}/{right}/{up} resolved to {target}.");
        Ok(self.move_to(MoveTarget::from(target), options))
    }

    pub fn rotate_yaw(&mut self, angle: f64, options: &CommandOptions) -> CommandHandle {
        let id = self.next_id();
        self.enqueue(Command::rotate_yaw(id, angle, options))
    }

    /// Appends a command to the queue.
    pub(crate) fn enqueue(&mut self, (cmd, handle): (Command, CommandHandle)) -> CommandHandle {
        event!("Queued {cmd}.");
        self.queue.push_back(cmd);
        if self.state == ControllerState::Idle {
            self.set_state(ControllerState::Running);
        }
        handle
    }

    /// Cancels everything in flight, then queues the command.
    pub(crate) fn execute_immediate(&mut self, issued: (Command, CommandHandle)) -> CommandHandle {
        let preempted = self.cancel();
        if preempted > 0 {
            cmd!("{} preempted {preempted} command(s).", issued.0);
        }
        self.enqueue(issued)
    }

    /// Advances the controller by one tick of `delta` seconds.
    ///
    /// # Returns
    /// - `true` if a command occupied this tick (even if it completed during it),
    ///   meaning the controller wrote the vehicle's instruction.
    pub fn update(&mut self, delta: f64) -> bool {
        if self.paused || self.vehicle.is_none() {
            return false;
        }
        if self.current.is_none() {
            self.start_next();
        }
        let snapshot = self.snapshot();
        let Some(mut cmd) = self.current.take() else {
            self.set_state(ControllerState::Idle);
            return false;
        };

        match cmd.update(delta, &snapshot) {
            Ok(instruction) => {
                self.apply(instruction);
                if cmd.is_settled() {
                    self.report_settled(&cmd);
                    self.start_next();
                } else {
                    self.current = Some(cmd);
                }
            }
            Err(err) => {
                error!("{cmd} faulted: {err}");
                cmd.fail(err);
                self.report_settled(&cmd);
                if self.queue.is_empty() {
                    self.set_state(ControllerState::Idle);
                }
            }
        }
        true
    }

    /// Cancels the current and every queued command and hovers in place.
    ///
    /// Also lifts a pause. Already settled commands are left untouched.
    ///
    /// # Returns
    /// - The number of outcomes this call settled.
    pub fn cancel(&mut self) -> usize {
        let mut dropped: Vec<Command> = self.current.take().into_iter().collect();
        dropped.extend(self.queue.drain(..));
        let mut cancelled = 0;
        for mut cmd in dropped {
            if cmd.cancel() {
                cancelled += 1;
                self.report_settled(&cmd);
            }
        }
        if cancelled > 0 {
            cmd!("Cancelled {cancelled} command(s).");
        }
        self.paused = false;
        self.set_state(ControllerState::Idle);
        self.hold_altitude();
        cancelled
    }

    /// Freezes command execution and hovers in place.
    ///
    /// # Errors
    /// - [`ControlError::InvalidTransition`] unless the controller is running.
    pub fn pause(&mut self) -> Result<(), ControlError> {
        if self.state != ControllerState::Running {
            return Err(ControlError::InvalidTransition { action: "pause", state: self.state });
        }
        self.paused = true;
        self.hold_altitude();
        self.set_state(ControllerState::Paused);
        info!("Controller paused with {} command(s) pending.", self.pending());
        Ok(())
    }

    /// Continues execution where [`FlightController::pause`] left off.
    ///
    /// # Errors
    /// - [`ControlError::InvalidTransition`] unless the controller is paused.
    pub fn resume(&mut self) -> Result<(), ControlError> {
        if self.state != ControllerState::Paused {
            return Err(ControlError::InvalidTransition { action: "resume", state: self.state });
        }
        self.paused = false;
        self.set_state(ControllerState::Running);
        info!("Controller resumed.");
        Ok(())
    }

    /// Applies an instruction from a non-autonomous source.
    ///
    /// # Returns
    /// - `false` if the controller is active this tick (or no vehicle is attached)
    ///   and the instruction was dropped.
    pub fn apply_external(&mut self, instruction: MotionInstruction) -> bool {
        if self.is_active() {
            return false;
        }
        match self.vehicle.as_mut() {
            Some(vehicle) if instruction.is_finite() => {
                vehicle.apply(instruction);
                true
            }
            Some(_) => {
                warn!("Dropping non-finite external instruction {instruction}.");
                false
            }
            None => false,
        }
    }

    /// Advances the attached vehicle's own dynamics.
    pub fn integrate(&mut self, delta: f64) {
        if let Some(vehicle) = self.vehicle.as_mut() {
            vehicle.integrate(delta);
        }
    }

    /// Whether the controller owns the instruction stream.
    pub fn is_active(&self) -> bool {
        !self.paused && self.vehicle.is_some() && self.pending() > 0
    }

    pub fn controller_state(&self) -> ControllerState { self.state }
    pub fn queue_len(&self) -> usize { self.queue.len() }
    pub fn current_command(&self) -> Option<&Command> { self.current.as_ref() }

    /// Returns the vehicle/controller snapshot handed to commands.
    pub fn state(&self) -> DroneState { self.snapshot() }

    fn snapshot(&self) -> DroneState {
        let (position, heading) = self
            .vehicle
            .as_ref()
            .map_or((Vec3D::zero(), 0.0), |v| (v.position(), v.heading()));
        DroneState::new(position, heading, self.is_active(), self.queue.len(), self.state)
    }

    fn pending(&self) -> usize { self.queue.len() + usize::from(self.current.is_some()) }

    fn next_id(&mut self) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Dequeues and starts the head of the queue, or goes idle if there is none.
    fn start_next(&mut self) {
        let Some(mut cmd) = self.queue.pop_front() else {
            self.set_state(ControllerState::Idle);
            return;
        };
        let snapshot = self.snapshot();
        cmd.start(&snapshot);
        cmd!("Started {cmd}.");
        self.emit(ControllerEvent::CommandStarted { id: cmd.id(), command: cmd.command_type() });
        self.current = Some(cmd);
        self.set_state(ControllerState::Running);
    }

    fn report_settled(&self, cmd: &Command) {
        let (id, command) = (cmd.id(), cmd.command_type());
        match (cmd.state(), cmd.error()) {
            (CommandState::Completed, _) => {
                cmd!("Completed {cmd} after {:.2}s.", cmd.elapsed());
                self.emit(ControllerEvent::CommandCompleted { id, command });
            }
            (_, Some(err)) => {
                if *err != CommandError::Cancelled {
                    warn!("{cmd} failed: {err}");
                }
                self.emit(ControllerEvent::CommandFailed { id, command, error: err.clone() });
            }
            (state, None) => warn!("{cmd} reported as settled in state {state}."),
        }
    }

    fn apply(&mut self, instruction: MotionInstruction) {
        if let Some(vehicle) = self.vehicle.as_mut() {
            vehicle.apply(instruction);
        }
    }

    fn hold_altitude(&mut self) {
        if let Some(vehicle) = self.vehicle.as_mut() {
            let altitude = vehicle.position().y();
            vehicle.apply(MotionInstruction::hover(altitude));
        }
    }

    fn set_state(&mut self, to: ControllerState) {
        let from = self.state;
        if from != to {
            self.state = to;
            event!("Controller {from} -> {to}.");
            self.emit(ControllerEvent::StateChanged { from, to });
        }
    }

    fn emit(&self, ev: ControllerEvent) {
        // Nobody listening is fine.
        let _ = self.event_hub.send(ev);
    }
}

impl Default for FlightController {
    fn default() -> Self { Self::new() }
}
