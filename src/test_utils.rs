//! # Test Utilities
//!
//! Scripted doubles for the connection capability and the backoff sleeper. Used
//! by unit tests, the integration suite, and downstream crates that want to
//! test code built on [`crate::Executor`] without a live server.

use crate::connection::{Connection, ConnectionFactory};
use crate::error::ConnectionError;
use crate::retry::Sleeper;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct ScriptState {
    dial_attempts: usize,
    created: usize,
    closed: usize,
    executed: usize,
    successes: i64,

    /// Id of the connection currently alive, if any
    outstanding: Option<usize>,

    dial_failures: VecDeque<ConnectionError>,
    dial_failure_forever: Option<ConnectionError>,
    replies: VecDeque<Result<Value, ConnectionError>>,
    close_error: Option<ConnectionError>,
    commands: Vec<String>,

    execute_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Factory whose connections follow a script and record everything done to them.
///
/// Unscripted executes succeed with `Value::Int(n)` where `n` counts successful
/// executes so far. Dialing while a previous connection is still open panics.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next dial fail with `err`
    pub fn fail_next_dial(&self, err: ConnectionError) {
        self.state.lock().dial_failures.push_back(err);
    }

    /// Make every dial fail with `err`
    pub fn fail_all_dials(&self, err: ConnectionError) {
        self.state.lock().dial_failure_forever = Some(err);
    }

    /// Queue the result of the next execute, on whichever connection runs it
    pub fn reply_next(&self, reply: Result<Value, ConnectionError>) {
        self.state.lock().replies.push_back(reply);
    }

    /// Make every close report `err` (the connection is still released)
    pub fn fail_closes(&self, err: ConnectionError) {
        self.state.lock().close_error = Some(err);
    }

    /// Hold each execute open for `delay` so overlapping calls become observable
    pub fn set_execute_delay(&self, delay: Duration) {
        self.state.lock().execute_delay = delay;
    }

    pub fn dial_attempts(&self) -> usize {
        self.state.lock().dial_attempts
    }

    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    pub fn executed(&self) -> usize {
        self.state.lock().executed
    }

    /// Commands in the order connections saw them, formatted as `NAME[arg arg]`
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<String> {
        self.state.lock().commands.last().cloned()
    }

    /// Highest number of executes observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    pub fn has_open_connection(&self) -> bool {
        self.state.lock().outstanding.is_some()
    }
}

impl ConnectionFactory for ScriptedFactory {
    fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let mut state = self.state.lock();
        state.dial_attempts += 1;

        if let Some(err) = state.dial_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = &state.dial_failure_forever {
            return Err(err.clone());
        }

        assert!(
            state.outstanding.is_none(),
            "dialed while connection {:?} is still open",
            state.outstanding
        );

        state.created += 1;
        let id = state.created;
        state.outstanding = Some(id);

        Ok(Box::new(ScriptedConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedConnection {
    id: usize,
    state: Arc<Mutex<ScriptState>>,
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, command: &str, args: &[Value]) -> Result<Value, ConnectionError> {
        let delay = {
            let mut state = self.state.lock();
            assert_eq!(
                state.outstanding,
                Some(self.id),
                "execute on a connection the factory no longer tracks"
            );
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.execute_delay
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.executed += 1;

        let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
        let line = format!("{command}[{}]", rendered.join(" "));

        match state.replies.pop_front() {
            Some(Err(err)) => Err(err),
            Some(Ok(value)) => {
                state.commands.push(line);
                Ok(value)
            }
            None => {
                state.commands.push(line);
                state.successes += 1;
                Ok(Value::Int(state.successes))
            }
        }
    }

    fn close(self: Box<Self>) -> Result<(), ConnectionError> {
        let mut state = self.state.lock();
        assert_eq!(
            state.outstanding,
            Some(self.id),
            "closing a connection the factory no longer tracks"
        );
        state.closed += 1;
        state.outstanding = None;

        match &state.close_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Records requested backoff waits instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
