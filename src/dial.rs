//! # Dial Factory
//!
//! Default [`ConnectionFactory`] backed by the blocking `redis` client. Command
//! encoding, reply decoding and socket timeouts are all handled by the client
//! library; this module only adapts its types to [`Connection`] and [`Value`].

use crate::connection::{Connection, ConnectionFactory};
use crate::error::{ConfigurationError, ConnectionError};
use crate::value::Value;
use redis::ToRedisArgs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Transport family used to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// `host:port`
    Tcp,
    /// Filesystem path of a Unix domain socket
    Unix,
}

impl FromStr for Network {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => Ok(Network::Tcp),
            "unix" => Ok(Network::Unix),
            other => Err(ConfigurationError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => write!(f, "tcp"),
            Network::Unix => write!(f, "unix"),
        }
    }
}

/// Addressing and timeouts for dialing a server.
///
/// A zero timeout means no timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialConfig {
    pub network: Network,
    pub address: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl DialConfig {
    pub fn connection_url(&self) -> String {
        match self.network {
            Network::Tcp => format!("redis://{}/", self.address),
            Network::Unix => format!("redis+unix://{}", self.address),
        }
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

fn dial_error(err: redis::RedisError) -> ConnectionError {
    if err.is_timeout() {
        ConnectionError::Timeout(err.to_string())
    } else {
        ConnectionError::Dial(err.to_string())
    }
}

/// Dials a fresh Redis connection on every call. Construction performs no I/O.
#[derive(Debug, Clone)]
pub struct DialFactory {
    config: DialConfig,
}

impl DialFactory {
    pub fn new(config: DialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }
}

impl ConnectionFactory for DialFactory {
    fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let client = redis::Client::open(self.config.connection_url().as_str()).map_err(dial_error)?;

        let conn = match non_zero(self.config.connect_timeout) {
            Some(timeout) => client.get_connection_with_timeout(timeout),
            None => client.get_connection(),
        }
        .map_err(dial_error)?;

        conn.set_read_timeout(non_zero(self.config.read_timeout))?;
        conn.set_write_timeout(non_zero(self.config.write_timeout))?;

        debug!(
            network = %self.config.network,
            address = %self.config.address,
            "Dialed Redis connection"
        );

        Ok(Box::new(RedisConnection { inner: conn }))
    }
}

/// [`Connection`] over a blocking `redis::Connection`
pub struct RedisConnection {
    inner: redis::Connection,
}

impl Connection for RedisConnection {
    fn execute(&mut self, command: &str, args: &[Value]) -> Result<Value, ConnectionError> {
        let mut cmd = redis::cmd(command);
        for arg in args {
            cmd.arg(arg);
        }
        let reply: redis::Value = cmd.query(&mut self.inner)?;
        reply_from_redis(reply)
    }

    fn close(self: Box<Self>) -> Result<(), ConnectionError> {
        // Dropping the client connection shuts the socket.
        drop(self.inner);
        Ok(())
    }
}

/// Arguments are sent as bulk strings. `Nil` has no argument form on the wire
/// and is sent as an empty bulk string; arrays are flattened into their items.
impl ToRedisArgs for Value {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + redis::RedisWrite,
    {
        match self {
            Value::Nil => out.write_arg(b""),
            Value::Int(i) => i.write_redis_args(out),
            Value::Data(bytes) => out.write_arg(bytes),
            Value::Status(s) => out.write_arg(s.as_bytes()),
            Value::Okay => out.write_arg(b"OK"),
            Value::Double(d) => d.write_redis_args(out),
            Value::Bool(b) => b.write_redis_args(out),
            Value::Array(items) => {
                for item in items {
                    item.write_redis_args(out);
                }
            }
        }
    }
}

fn reply_from_redis(reply: redis::Value) -> Result<Value, ConnectionError> {
    let value = match reply {
        redis::Value::Nil => Value::Nil,
        redis::Value::Int(i) => Value::Int(i),
        redis::Value::BulkString(bytes) => Value::Data(bytes),
        redis::Value::SimpleString(s) => Value::Status(s),
        redis::Value::Okay => Value::Okay,
        redis::Value::Double(d) => Value::Double(d),
        redis::Value::Boolean(b) => Value::Bool(b),
        redis::Value::VerbatimString { text, .. } => Value::Data(text.into_bytes()),
        redis::Value::Array(items) | redis::Value::Set(items) => Value::Array(
            items
                .into_iter()
                .map(reply_from_redis)
                .collect::<Result<_, _>>()?,
        ),
        redis::Value::Push { data, .. } => Value::Array(
            data.into_iter()
                .map(reply_from_redis)
                .collect::<Result<_, _>>()?,
        ),
        redis::Value::Map(pairs) => {
            let mut flat = Vec::with_capacity(pairs.len() * 2);
            for (key, value) in pairs {
                flat.push(reply_from_redis(key)?);
                flat.push(reply_from_redis(value)?);
            }
            Value::Array(flat)
        }
        redis::Value::Attribute { data, .. } => reply_from_redis(*data)?,
        other => {
            return Err(ConnectionError::Protocol(format!(
                "unsupported reply: {other:?}"
            )))
        }
    };
    Ok(value)
}
