//! Remote control console: a TCP endpoint exchanging length-prefixed JSON
//! frames, and the messenger dispatching them to the flight controller and
//! the mission runner.

mod console_endpoint;
mod console_error;
mod console_messages;
mod console_messenger;
#[cfg(test)]
mod tests;

pub use console_error::ConsoleError;
pub use console_messages::{Downstream, RequestId, Upstream};
pub(crate) use console_messenger::ConsoleMessenger;
