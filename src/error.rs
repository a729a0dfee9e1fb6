//! # Error Types
//!
//! [`ConnectionError`] is what a connection, a factory or the executor hands back
//! to callers. Its variants fall into two classes:
//!
//! - **Transport**: the connection itself is unusable (I/O failure, peer hung up,
//!   timeout, dial failure). The executor drops the connection and retries.
//! - **Application**: the server or the client library rejected the command.
//!   The connection is fine and the error is surfaced immediately.

use std::io;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Socket-level failure while talking to the server
    #[error("Connection I/O error ({kind:?}): {message}")]
    Io { kind: io::ErrorKind, message: String },

    /// Peer closed the stream
    #[error("Connection closed by peer")]
    Eof,

    /// Read, write or connect deadline elapsed
    #[error("Connection timed out: {0}")]
    Timeout(String),

    /// A new connection could not be established
    #[error("Dial failed: {0}")]
    Dial(String),

    /// Error reply sent by the server
    #[error("Server error: {0}")]
    Server(String),

    /// Reply could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Command or arguments rejected before reaching the server
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ConnectionError {
    /// Whether the error means the connection that produced it can no longer be used.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConnectionError::Io { .. }
                | ConnectionError::Eof
                | ConnectionError::Timeout(_)
                | ConnectionError::Dial(_)
        )
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ConnectionError::Eof,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                ConnectionError::Timeout(err.to_string())
            }
            kind => ConnectionError::Io {
                kind,
                message: err.to_string(),
            },
        }
    }
}

impl From<redis::RedisError> for ConnectionError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            return ConnectionError::Timeout(err.to_string());
        }
        if err.is_connection_refusal() {
            return ConnectionError::Dial(err.to_string());
        }
        if err.is_connection_dropped() {
            return ConnectionError::Eof;
        }
        if err.is_io_error() {
            return ConnectionError::Io {
                kind: io::ErrorKind::Other,
                message: err.to_string(),
            };
        }

        match err.kind() {
            redis::ErrorKind::TypeError | redis::ErrorKind::ParseError => {
                ConnectionError::Protocol(err.to_string())
            }
            redis::ErrorKind::InvalidClientConfig | redis::ErrorKind::ClientError => {
                ConnectionError::InvalidArgument(err.to_string())
            }
            _ => ConnectionError::Server(err.to_string()),
        }
    }
}

/// Errors raised while loading or validating executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown network family: {0}")]
    UnknownNetwork(String),

    #[error("Invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ConnectionError::Eof.is_transport());
        assert!(ConnectionError::Timeout("read".to_string()).is_transport());
        assert!(ConnectionError::Dial("refused".to_string()).is_transport());
        assert!(ConnectionError::Io {
            kind: io::ErrorKind::BrokenPipe,
            message: "broken pipe".to_string(),
        }
        .is_transport());

        assert!(!ConnectionError::Server("ERR unknown command".to_string()).is_transport());
        assert!(!ConnectionError::Protocol("bad reply".to_string()).is_transport());
        assert!(!ConnectionError::InvalidArgument("empty".to_string()).is_transport());
    }

    #[test]
    fn test_io_error_mapping() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(ConnectionError::from(eof), ConnectionError::Eof);

        let timeout = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert!(matches!(
            ConnectionError::from(timeout),
            ConnectionError::Timeout(_)
        ));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            ConnectionError::from(reset),
            ConnectionError::Io {
                kind: io::ErrorKind::ConnectionReset,
                ..
            }
        ));
    }

    #[test]
    fn test_redis_io_error_is_transport() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let err = ConnectionError::from(redis::RedisError::from(io_err));
        assert!(err.is_transport(), "got {err:?}");
    }

    #[test]
    fn test_redis_response_error_is_application() {
        let err = ConnectionError::from(redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "WRONGTYPE",
        )));
        assert!(matches!(err, ConnectionError::Server(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_redis_type_error_is_protocol() {
        let err = ConnectionError::from(redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "unexpected reply",
        )));
        assert!(matches!(err, ConnectionError::Protocol(_)));
    }
}
