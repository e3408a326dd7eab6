//! Request and response values for a single exchange.
//!
//! # Design
//! Both types are plain owned data so they can be built from, and handed
//! back to, a foreign caller without lifetime concerns. `RequestSpec` can only
//! be constructed through `RequestSpec::new`, which performs the type/range
//! checks; anything beyond that (resolvability, reachability) is discovered by
//! the exchange itself.

use crate::error::ExchangeError;

/// Status reported for a completed exchange. There is no other success value.
pub const STATUS_OK: i32 = 0;

/// Validated input for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    host: String,
    port: u16,
    payload: Vec<u8>,
}

impl RequestSpec {
    /// Build a request, rejecting an empty host or a port outside 1..=65535.
    ///
    /// `port` is taken as `i64` so out-of-range values coming from a foreign
    /// caller are reported as `InvalidArgument` instead of being truncated.
    pub fn new(
        host: impl Into<String>,
        port: i64,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, ExchangeError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ExchangeError::InvalidArgument("host is empty".to_string()));
        }
        let port = match u16::try_from(port) {
            Ok(p) if p != 0 => p,
            _ => {
                return Err(ExchangeError::InvalidArgument(format!(
                    "port {port} out of range 1-65535"
                )));
            }
        };
        Ok(Self {
            host,
            port,
            payload: payload.into(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// `host:port` with IPv6 literals bracketed, for logs and error messages.
    pub fn target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseResult {
    pub status: i32,
    pub received: Vec<u8>,
}

impl ResponseResult {
    pub(crate) fn ok(received: Vec<u8>) -> Self {
        Self {
            status: STATUS_OK,
            received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_boundary_ports() {
        assert_eq!(RequestSpec::new("localhost", 1, "x").unwrap().port(), 1);
        assert_eq!(RequestSpec::new("localhost", 65535, "x").unwrap().port(), 65535);
    }

    #[test]
    fn rejects_out_of_range_ports() {
        for port in [0, -1, 65536, i64::MAX, i64::MIN] {
            let err = RequestSpec::new("localhost", port, "x").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "port {port}");
        }
    }

    #[test]
    fn rejects_blank_host() {
        for host in ["", "   "] {
            let err = RequestSpec::new(host, 80, Vec::new()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn empty_payload_is_allowed() {
        let spec = RequestSpec::new("127.0.0.1", 7, Vec::new()).unwrap();
        assert!(spec.payload().is_empty());
    }

    #[test]
    fn target_brackets_ipv6_literals() {
        let spec = RequestSpec::new("::1", 8080, "x").unwrap();
        assert_eq!(spec.target(), "[::1]:8080");
        let spec = RequestSpec::new("example.com", 80, "x").unwrap();
        assert_eq!(spec.target(), "example.com:80");
    }
}
