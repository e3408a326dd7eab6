//! The connect, send, receive-until-close round trip.
//!
//! # Design
//! `TcpExchange` holds only its `ExchangeConfig` and carries no state between
//! calls, so one value can serve any number of threads. Each `execute` call
//! owns its subsystem guard and its `Connection` as locals. They are declared
//! in acquisition order and therefore dropped in reverse, on success and on
//! every `?` alike: socket first, subsystem second.
//!
//! Only the first resolved address is tried unless
//! `ExchangeConfig::fallback_to_next_candidate` is set.

use std::net::{SocketAddr, ToSocketAddrs};

use tracing::{debug, info_span};

use crate::config::ExchangeConfig;
use crate::connection::Connection;
use crate::error::ExchangeError;
use crate::subsystem::NetSubsystem;
use crate::types::{RequestSpec, ResponseResult};

/// Blocking, stateless executor for single TCP exchanges.
#[derive(Debug, Clone, Default)]
pub struct TcpExchange {
    config: ExchangeConfig,
}

impl TcpExchange {
    pub fn new(config: ExchangeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Run one exchange. Blocks for resolution, connect, send and every read.
    pub fn execute(&self, spec: RequestSpec) -> Result<ResponseResult, ExchangeError> {
        let span = info_span!("exchange", host = spec.host(), port = spec.port());
        let _entered = span.enter();

        let _subsystem = NetSubsystem::acquire()?;
        let candidates = resolve(&spec)?;
        let mut conn = self.connect(&candidates)?;

        conn.send_all(spec.payload())?;
        conn.shutdown_write()?;
        let received = conn.receive_to_end(self.config.read_chunk())?;
        conn.close();

        debug!(
            sent = spec.payload().len(),
            received = received.len(),
            "exchange complete"
        );
        Ok(ResponseResult::ok(received))
    }

    fn connect(&self, candidates: &[SocketAddr]) -> Result<Connection, ExchangeError> {
        let Some((first, rest)) = candidates.split_first() else {
            return Err(ExchangeError::ResolutionFailed {
                target: String::new(),
                reason: "no addresses".to_string(),
            });
        };

        let mut last_err = match Connection::connect(*first, self.config.nodelay) {
            Ok(conn) => return Ok(conn),
            Err(e) => e,
        };
        if !self.config.fallback_to_next_candidate {
            return Err(last_err);
        }
        for addr in rest {
            debug!(error = %last_err, next = %addr, "trying next candidate");
            match Connection::connect(*addr, self.config.nodelay) {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

/// Shorthand for `TcpExchange::default().execute(RequestSpec::new(..)?)`.
pub fn execute(
    host: &str,
    port: i64,
    payload: impl Into<Vec<u8>>,
) -> Result<ResponseResult, ExchangeError> {
    let spec = RequestSpec::new(host, port, payload)?;
    TcpExchange::default().execute(spec)
}

fn resolve(spec: &RequestSpec) -> Result<Vec<SocketAddr>, ExchangeError> {
    let failed = |reason: String| ExchangeError::ResolutionFailed {
        target: spec.target(),
        reason,
    };
    let addrs: Vec<SocketAddr> = (spec.host(), spec.port())
        .to_socket_addrs()
        .map_err(|e| failed(e.to_string()))?
        .collect();
    if addrs.is_empty() {
        return Err(failed("no addresses".to_string()));
    }
    debug!(candidates = addrs.len(), first = %addrs[0], "resolved");
    Ok(addrs)
}
