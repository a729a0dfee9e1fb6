//! # Executor
//!
//! Serializes command execution over a single lazily-dialed connection and hides
//! transient connection loss by reconnecting and retrying.
//!
//! ## Attempt lifecycle
//!
//! Each attempt runs entirely under the connection guard:
//!
//! 1. Dial through the factory if no connection is held
//! 2. Execute the command on the held connection
//! 3. Classify the result: transport failures close and discard the connection,
//!    anything else puts it back
//!
//! The retry loop only continues while attempts end with the connection dropped.
//! Application errors keep the connection and are returned on the first attempt.
//! Backoff waits happen outside the guard so other callers can make progress.

use crate::config::ExecutorConfig;
use crate::connection::{Connection, ConnectionFactory, Outcome};
use crate::dial::{DialConfig, DialFactory, Network};
use crate::error::{ConfigurationError, ConnectionError};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::value::Value;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Whether an attempt left the connection in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Kept,
    Dropped,
}

struct Attempt {
    result: Result<Value, ConnectionError>,
    disposition: Disposition,
}

/// The single held connection together with the guard that protects it.
///
/// Every read or write of the connection goes through `held.lock()`.
#[derive(Default)]
struct ConnectionSlot {
    held: Mutex<Option<Box<dyn Connection>>>,
}

impl ConnectionSlot {
    fn attempt(&self, factory: &dyn ConnectionFactory, command: &str, args: &[Value]) -> Attempt {
        let mut held = self.held.lock();

        let mut conn = match held.take() {
            Some(conn) => conn,
            None => match factory.connect() {
                Ok(conn) => {
                    debug!(command = %command, "Established new connection");
                    conn
                }
                Err(err) => {
                    warn!(command = %command, error = %err, "Failed to establish connection");
                    return Attempt {
                        result: Err(err),
                        disposition: Disposition::Dropped,
                    };
                }
            },
        };

        let result = conn.execute(command, args);

        match Outcome::classify(&result) {
            Outcome::TransportFailure => {
                if let Err(err) = &result {
                    warn!(command = %command, error = %err, "Transport failure, dropping connection");
                }
                close_connection(conn);
                Attempt {
                    result,
                    disposition: Disposition::Dropped,
                }
            }
            Outcome::Success | Outcome::ApplicationFailure => {
                *held = Some(conn);
                Attempt {
                    result,
                    disposition: Disposition::Kept,
                }
            }
        }
    }

    fn release(&self) {
        let mut held = self.held.lock();
        if let Some(conn) = held.take() {
            close_connection(conn);
        }
    }

    fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn close_connection(conn: Box<dyn Connection>) {
    if let Err(err) = conn.close() {
        warn!(error = %err, "Error while closing connection");
    }
}

/// Executes commands against a remote server through one reconnecting connection.
///
/// Construction never dials. The first `execute` call establishes the connection.
/// Safe to share between threads; concurrent calls are serialized.
pub struct Executor {
    factory: Box<dyn ConnectionFactory>,
    slot: ConnectionSlot,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("factory", &"ConnectionFactory")
            .field("connected", &self.slot.is_held())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Executor {
    /// Create an executor using the default retry policy (5 attempts, 1s backoff unit).
    pub fn new(factory: impl ConnectionFactory + 'static) -> Self {
        Self::with_policy(factory, RetryPolicy::default())
    }

    pub fn with_policy(factory: impl ConnectionFactory + 'static, policy: RetryPolicy) -> Self {
        Self {
            factory: Box::new(factory),
            slot: ConnectionSlot::default(),
            policy,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Create an executor that dials a Redis server with the given timeouts.
    ///
    /// No connection is established by calling this function.
    pub fn dial_timeout(
        network: Network,
        address: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self::new(DialFactory::new(DialConfig {
            network,
            address: address.into(),
            connect_timeout,
            read_timeout,
            write_timeout,
        }))
    }

    /// Create a dialing executor from validated configuration.
    ///
    /// No connection is established by calling this function.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::with_policy(
            DialFactory::new(config.dial_config()),
            config.retry_policy(),
        ))
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.slot.is_held()
    }

    /// Execute a command, reconnecting and retrying on transport failures.
    ///
    /// Application errors are returned immediately. After `max_attempts`
    /// transport or dial failures the last error is returned.
    pub fn execute(&self, command: &str, args: &[Value]) -> Result<Value, ConnectionError> {
        let mut failed_attempts: u32 = 0;

        loop {
            let Attempt {
                result,
                disposition,
            } = self.slot.attempt(self.factory.as_ref(), command, args);

            if disposition == Disposition::Kept {
                return result;
            }

            let backoff = self.policy.backoff(failed_attempts);
            failed_attempts += 1;

            if !self.policy.allows_retry(failed_attempts) {
                if let Err(err) = &result {
                    error!(
                        command = %command,
                        attempts = failed_attempts,
                        error = %err,
                        "Giving up after repeated connection failures"
                    );
                }
                return result;
            }

            debug!(
                command = %command,
                attempt = failed_attempts,
                backoff_ms = millis(backoff),
                "Retrying after connection failure"
            );
            self.sleeper.sleep(backoff);
        }
    }

    /// Close and release the held connection, if any.
    ///
    /// The executor stays usable; the next `execute` dials again.
    pub fn shutdown(&self) {
        self.slot.release();
    }
}
