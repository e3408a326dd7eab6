//! Blocking TCP request/response exchange.
//!
//! # Overview
//! One operation: connect to `host:port`, write a payload, half-close, read
//! until the peer closes, and report status `0` with the bytes received, or
//! one typed `ExchangeError`.
//!
//! # Design
//! - `TcpExchange` is stateless apart from its `ExchangeConfig`.
//! - The socket (`Connection`) and the platform networking subsystem
//!   (`NetSubsystem`) are RAII guards; release happens on drop, on every path.
//! - A read error after data has arrived ends the stream and keeps the data.
//! - No timeouts, retries or async I/O. Callers that need a deadline run the
//!   exchange on their own worker.
//! - Plain owned types throughout so the C boundary crate can map them
//!   directly.

pub mod config;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod subsystem;
pub mod types;

pub use config::{ConfigError, ExchangeConfig};
pub use connection::{open_connections, Connection, ConnectionState};
pub use error::{ConnectStage, ErrorKind, ExchangeError};
pub use exchange::{execute, TcpExchange};
pub use subsystem::{active_handles, NetSubsystem};
pub use types::{RequestSpec, ResponseResult, STATUS_OK};
