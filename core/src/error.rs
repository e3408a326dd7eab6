//! Error types for a TCP exchange.
//!
//! # Design
//! Every failure of `TcpExchange::execute` lands in exactly one
//! `ExchangeError` variant. Variants that stem from an OS call keep the
//! underlying `io::Error` as their source so callers can still inspect the
//! raw error code. `ErrorKind` is the fieldless projection used where only the
//! category matters (the C boundary, logging, test assertions).

use std::fmt;
use std::io;

use thiserror::Error;

/// Sub-stage of connection establishment that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// Creating the OS socket for the resolved address family.
    Socket,
    /// The TCP handshake itself.
    Connect,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectStage::Socket => write!(f, "socket"),
            ConnectStage::Connect => write!(f, "connect"),
        }
    }
}

/// Errors returned by `TcpExchange::execute`.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Rejected before any network I/O: bad port, empty host, bad config.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("networking subsystem failed to initialize: {source}")]
    SubsystemInitFailed {
        #[source]
        source: io::Error,
    },

    /// Resolution failed outright or yielded no address.
    #[error("could not resolve {target}: {reason}")]
    ResolutionFailed { target: String, reason: String },

    #[error("{stage} to {target} failed: {source}")]
    ConnectionFailed {
        stage: ConnectStage,
        target: String,
        #[source]
        source: io::Error,
    },

    /// The payload could not be fully written. `sent` counts bytes that left
    /// before the failure.
    #[error("send failed after {sent} of {total} bytes: {source}")]
    SendFailed {
        sent: usize,
        total: usize,
        #[source]
        source: io::Error,
    },

    #[error("shutdown of write half failed: {source}")]
    ShutdownFailed {
        #[source]
        source: io::Error,
    },

    /// A read failed before a single byte was received.
    #[error("receive failed: {source}")]
    ReceiveFailed {
        #[source]
        source: io::Error,
    },
}

/// Category of an `ExchangeError`, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    SubsystemInitFailed,
    ResolutionFailed,
    ConnectionFailed,
    SendFailed,
    ShutdownFailed,
    ReceiveFailed,
}

impl ErrorKind {
    /// Stable snake_case name, used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::SubsystemInitFailed => "subsystem_init_failed",
            ErrorKind::ResolutionFailed => "resolution_failed",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::SendFailed => "send_failed",
            ErrorKind::ShutdownFailed => "shutdown_failed",
            ErrorKind::ReceiveFailed => "receive_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ExchangeError::SubsystemInitFailed { .. } => ErrorKind::SubsystemInitFailed,
            ExchangeError::ResolutionFailed { .. } => ErrorKind::ResolutionFailed,
            ExchangeError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            ExchangeError::SendFailed { .. } => ErrorKind::SendFailed,
            ExchangeError::ShutdownFailed { .. } => ErrorKind::ShutdownFailed,
            ExchangeError::ReceiveFailed { .. } => ErrorKind::ReceiveFailed,
        }
    }
}
