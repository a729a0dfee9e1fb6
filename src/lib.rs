#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # redoer
//!
//! Resilient command execution over a single connection to a Redis-style server.
//!
//! ## Overview
//!
//! An [`Executor`] owns at most one connection, dialed lazily through a
//! [`ConnectionFactory`]. Every command runs under one guard, so no two commands
//! are ever in flight on the wire at the same time. When a command fails at the
//! transport level (I/O error, peer hang-up, timeout) the connection is closed,
//! discarded and re-dialed, with up to five attempts and a linear backoff of
//! 0, 1, 2, 3 seconds between them. Errors reported by the server are returned
//! immediately and the connection is kept.
//!
//! ## Module Organization
//!
//! - [`executor`] - Retry loop and connection lifecycle
//! - [`connection`] - Connection and factory capabilities, failure classification
//! - [`retry`] - Attempt bound, backoff schedule, sleeper seam
//! - [`dial`] - Default factory backed by the `redis` client
//! - [`value`] - Argument and reply values
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Connection and configuration errors
//! - [`logging`] - `tracing` subscriber setup
//! - `test_utils` - Scripted test doubles (behind the `test-utils` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use redoer::{Executor, Network, Value};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Executor::dial_timeout(
//!     Network::Tcp,
//!     "127.0.0.1:6379",
//!     Duration::from_secs(5),
//!     Duration::from_secs(1),
//!     Duration::from_secs(1),
//! );
//!
//! executor.execute("SET", &["greeting".into(), "hello".into()])?;
//! let reply = executor.execute("GET", &[Value::from("greeting")])?;
//! println!("greeting = {reply}");
//!
//! executor.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dial;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod value;

pub use config::ExecutorConfig;
pub use connection::{Connection, ConnectionFactory, Outcome};
pub use dial::{DialConfig, DialFactory, Network, RedisConnection};
pub use error::{ConfigurationError, ConnectionError, Result};
pub use executor::Executor;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use value::Value;
