//! # Connection Capability
//!
//! The executor talks to the remote server only through these two traits. A
//! concrete client library (see [`crate::dial`]) or a test double sits behind them.

use crate::error::ConnectionError;
use crate::value::Value;

/// An established channel to the remote command server.
///
/// Implementations execute one command at a time; the executor guarantees it
/// never calls `execute` concurrently on the same instance.
pub trait Connection: Send {
    /// Send one command and wait for its reply.
    fn execute(&mut self, command: &str, args: &[Value]) -> Result<Value, ConnectionError>;

    /// Close the connection. Consumes it, so a closed connection is never reused.
    fn close(self: Box<Self>) -> Result<(), ConnectionError>;
}

/// Produces fresh, independent connections.
///
/// All addressing, dialing and timeout configuration lives inside the factory.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError>;
}

impl<F> ConnectionFactory for F
where
    F: Fn() -> Result<Box<dyn Connection>, ConnectionError> + Send + Sync,
{
    fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        self()
    }
}

/// Classification of a single execute result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reply received
    Success,
    /// The connection is broken; drop it and reconnect
    TransportFailure,
    /// The server or client rejected the command; the connection is still usable
    ApplicationFailure,
}

impl Outcome {
    pub fn classify<T>(result: &Result<T, ConnectionError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(err) if err.is_transport() => Outcome::TransportFailure,
            Err(_) => Outcome::ApplicationFailure,
        }
    }

    /// Whether the connection that produced this outcome must be discarded
    pub fn drops_connection(self) -> bool {
        self == Outcome::TransportFailure
    }
}
