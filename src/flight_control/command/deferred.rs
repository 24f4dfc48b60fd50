use super::{
    base_command::{CommandId, CommandType},
    command_error::CommandError,
};
use crate::flight_control::common::Vec3D;
use serde::Serialize;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot::{self, error::TryRecvError};

/// The value a successfully completed command settles with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// Hover engaged at the recorded altitude.
    Hovering { altitude: f64 },
    /// A vertical command reached its target band.
    Altitude { altitude: f64, target: f64 },
    /// A move reached its target.
    Position { position: Vec3D<f64>, target: Vec3D<f64> },
    /// A yaw request was accepted.
    Heading { angle: f64 },
}

pub type CommandResult = Result<CommandOutput, CommandError>;

/// Write side of a command's single-assignment outcome.
///
/// Only the first call to [`Deferred::settle`] has an effect. Dropping an
/// unsettled `Deferred` settles it as cancelled, so no handle waits forever.
#[derive(Debug)]
pub(crate) struct Deferred {
    tx: Option<oneshot::Sender<CommandResult>>,
}

impl Deferred {
    pub(crate) fn new(id: CommandId, command: CommandType) -> (Self, CommandHandle) {
        let (tx, rx) = oneshot::channel();
        (
            Self { tx: Some(tx) },
            CommandHandle { id, command, rx, settled: None },
        )
    }

    /// Settles the outcome.
    ///
    /// # Returns
    /// - `true` if this call settled the outcome, `false` if it was already settled.
    pub(crate) fn settle(&mut self, result: CommandResult) -> bool {
        if let Some(tx) = self.tx.take() {
            // The caller may have dropped its handle; the outcome is settled regardless.
            let _ = tx.send(result);
            true
        } else {
            false
        }
    }

    pub(crate) fn is_settled(&self) -> bool { self.tx.is_none() }
}

impl Drop for Deferred {
    fn drop(&mut self) { self.settle(Err(CommandError::Cancelled)); }
}

/// Read side of a command's outcome, handed to whoever issued the command.
///
/// Await it from async code, or poll it with [`CommandHandle::try_result`]
/// from a tick loop.
#[derive(Debug)]
pub struct CommandHandle {
    id: CommandId,
    command: CommandType,
    rx: oneshot::Receiver<CommandResult>,
    settled: Option<CommandResult>,
}

impl CommandHandle {
    pub fn id(&self) -> CommandId { self.id }
    pub fn command(&self) -> CommandType { self.command }

    /// Returns the outcome if it has settled, without waiting.
    pub fn try_result(&mut self) -> Option<CommandResult> {
        if self.settled.is_none() {
            self.settled = match self.rx.try_recv() {
                Ok(res) => Some(res),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Err(CommandError::Cancelled)),
            };
        }
        self.settled.clone()
    }

    pub fn is_settled(&mut self) -> bool { self.try_result().is_some() }
}

impl Future for CommandHandle {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(res) = &self.settled {
            return Poll::Ready(res.clone());
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(recv) => {
                let result = recv.unwrap_or(Err(CommandError::Cancelled));
                self.settled = Some(result.clone());
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
