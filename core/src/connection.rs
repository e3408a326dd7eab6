//! One owned TCP socket and its lifecycle.
//!
//! # Design
//! `Connection` walks `Unconnected -> Connected -> HalfClosed -> Closed`.
//! The socket is created with `socket2` so that socket creation and the
//! handshake fail as distinct stages, then handed to `std::net::TcpStream`
//! for I/O (std suppresses `SIGPIPE` on send, which matters when this code
//! is loaded into a foreign host process).
//!
//! Closing is done by `Drop` only. Every early return in an exchange drops
//! the `Connection`, so there is no per-branch cleanup to forget.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};

use crate::error::{ConnectStage, ExchangeError};

static OPEN: AtomicUsize = AtomicUsize::new(0);

/// Number of sockets opened by this crate that are not yet closed.
pub fn open_connections() -> usize {
    OPEN.load(Ordering::SeqCst)
}

/// Counts one live OS socket from creation until drop.
#[derive(Debug)]
struct SocketToken;

impl SocketToken {
    fn new() -> Self {
        OPEN.fetch_add(1, Ordering::SeqCst);
        SocketToken
    }
}

impl Drop for SocketToken {
    fn drop(&mut self) {
        OPEN.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    /// Write direction shut down; reads still allowed.
    HalfClosed,
    Closed,
}

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    state: ConnectionState,
    bytes_sent: usize,
    bytes_received: usize,
    // Declared after `stream`: fields drop in order, so the count falls only
    // once the socket is closed.
    _token: SocketToken,
}

impl Connection {
    /// Create a stream socket for `addr`'s family and connect it.
    pub fn connect(addr: SocketAddr, nodelay: bool) -> Result<Self, ExchangeError> {
        let target = addr.to_string();
        let stage_err = |stage: ConnectStage, source: io::Error| ExchangeError::ConnectionFailed {
            stage,
            target: target.clone(),
            source,
        };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| stage_err(ConnectStage::Socket, e))?;
        let token = SocketToken::new();
        trace!(peer = %addr, state = ?ConnectionState::Unconnected, "socket created");

        socket
            .connect(&addr.into())
            .map_err(|e| stage_err(ConnectStage::Connect, e))?;
        let stream = TcpStream::from(socket);
        if nodelay {
            stream
                .set_nodelay(true)
                .map_err(|e| stage_err(ConnectStage::Socket, e))?;
        }

        let mut conn = Connection {
            stream,
            peer: addr,
            state: ConnectionState::Unconnected,
            bytes_sent: 0,
            bytes_received: 0,
            _token: token,
        };
        conn.transition(ConnectionState::Connected);
        Ok(conn)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Write the whole payload. An empty payload writes nothing.
    pub fn send_all(&mut self, payload: &[u8]) -> Result<(), ExchangeError> {
        let result = write_payload(&mut self.stream, payload);
        self.bytes_sent = match &result {
            Ok(()) => payload.len(),
            Err(ExchangeError::SendFailed { sent, .. }) => *sent,
            Err(_) => 0,
        };
        result
    }

    /// Shut down the write direction so the peer sees end-of-request.
    pub fn shutdown_write(&mut self) -> Result<(), ExchangeError> {
        self.stream
            .shutdown(Shutdown::Write)
            .map_err(|source| ExchangeError::ShutdownFailed { source })?;
        self.transition(ConnectionState::HalfClosed);
        Ok(())
    }

    /// Read until the peer closes, `chunk` bytes at a time.
    pub fn receive_to_end(&mut self, chunk: usize) -> Result<Vec<u8>, ExchangeError> {
        let received = drain(&mut self.stream, chunk)?;
        self.bytes_received = received.len();
        Ok(received)
    }

    /// Close the socket now. Equivalent to dropping the connection.
    pub fn close(self) {}

    fn transition(&mut self, next: ConnectionState) {
        debug!(
            peer = %self.peer,
            from = ?self.state,
            to = ?next,
            bytes_sent = self.bytes_sent,
            bytes_received = self.bytes_received,
            "connection state"
        );
        self.state = next;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.transition(ConnectionState::Closed);
    }
}

/// Write `payload` completely, resuming after short writes and `EINTR`.
///
/// A zero-length write means the socket can take no more, which is reported
/// as `WriteZero`.
pub(crate) fn write_payload<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ExchangeError> {
    let mut sent = 0;
    while sent < payload.len() {
        match writer.write(&payload[sent..]) {
            Ok(0) => {
                return Err(ExchangeError::SendFailed {
                    sent,
                    total: payload.len(),
                    source: io::Error::new(io::ErrorKind::WriteZero, "socket accepted no bytes"),
                });
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ExchangeError::SendFailed {
                    sent,
                    total: payload.len(),
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Accumulate reads until end-of-stream.
///
/// A read error ends the stream: with nothing received it is a
/// `ReceiveFailed`, otherwise the bytes already read are returned.
pub(crate) fn drain<R: Read>(reader: &mut R, chunk: usize) -> Result<Vec<u8>, ExchangeError> {
    let mut buf = vec![0u8; chunk.max(1)];
    let mut received = Vec::new();
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                received.extend_from_slice(&buf[..n]);
                trace!(chunk = n, total = received.len(), "read");
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) if received.is_empty() => {
                return Err(ExchangeError::ReceiveFailed { source });
            }
            Err(e) => {
                warn!(error = %e, kept = received.len(), "read failed, keeping partial response");
                break;
            }
        }
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::VecDeque;

    /// Reader that replays a fixed script of results.
    struct Script(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len(), "script chunk larger than buffer");
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
            }
        }
    }

    fn script(steps: Vec<io::Result<Vec<u8>>>) -> Script {
        Script(steps.into())
    }

    /// Writer that accepts at most `limit` bytes per call and fails after
    /// `budget` bytes in total.
    struct Limited {
        limit: usize,
        budget: usize,
        written: Vec<u8>,
        on_exhausted: fn() -> io::Result<usize>,
    }

    impl Write for Limited {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return (self.on_exhausted)();
            }
            let n = buf.len().min(self.limit).min(self.budget);
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drain_concatenates_chunks_until_eof() {
        let mut reader = script(vec![Ok(b"hel".to_vec()), Ok(b"lo".to_vec())]);
        assert_eq!(drain(&mut reader, 4).unwrap(), b"hello");
    }

    #[test]
    fn drain_retries_interrupted_reads() {
        let mut reader = script(vec![
            Ok(b"a".to_vec()),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"b".to_vec()),
        ]);
        assert_eq!(drain(&mut reader, 1).unwrap(), b"ab");
    }

    #[test]
    fn drain_keeps_partial_data_on_error() {
        let mut reader = script(vec![
            Ok(b"partial".to_vec()),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
            Ok(b"never read".to_vec()),
        ]);
        assert_eq!(drain(&mut reader, 16).unwrap(), b"partial");
    }

    #[test]
    fn drain_error_before_any_byte_is_receive_failed() {
        let mut reader = script(vec![Err(io::Error::from(io::ErrorKind::ConnectionReset))]);
        let err = drain(&mut reader, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReceiveFailed);
    }

    #[test]
    fn drain_immediate_eof_is_empty_success() {
        let mut reader = script(Vec::new());
        assert!(drain(&mut reader, 512).unwrap().is_empty());
    }

    #[test]
    fn write_payload_resumes_short_writes() {
        let mut writer = Limited {
            limit: 3,
            budget: usize::MAX,
            written: Vec::new(),
            on_exhausted: || Ok(0),
        };
        write_payload(&mut writer, b"0123456789").unwrap();
        assert_eq!(writer.written, b"0123456789");
    }

    #[test]
    fn write_payload_reports_bytes_sent_before_failure() {
        let mut writer = Limited {
            limit: 4,
            budget: 6,
            written: Vec::new(),
            on_exhausted: || Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        };
        let err = write_payload(&mut writer, b"0123456789").unwrap_err();
        match err {
            ExchangeError::SendFailed { sent, total, source } => {
                assert_eq!(sent, 6);
                assert_eq!(total, 10);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn write_payload_zero_write_is_send_failed() {
        let mut writer = Limited {
            limit: 8,
            budget: 0,
            written: Vec::new(),
            on_exhausted: || Ok(0),
        };
        let err = write_payload(&mut writer, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SendFailed);
    }

    #[test]
    fn write_payload_empty_never_writes() {
        let mut writer = Limited {
            limit: 8,
            budget: 0,
            written: Vec::new(),
            on_exhausted: || panic!("empty payload must not write"),
        };
        write_payload(&mut writer, b"").unwrap();
    }

    #[test]
    fn connect_to_closed_port_fails_at_connect_stage() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Connection::connect(addr, false).unwrap_err();
        match err {
            ExchangeError::ConnectionFailed { stage, .. } => assert_eq!(stage, ConnectStage::Connect),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connection_walks_states_against_live_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).unwrap();
            stream.write_all(&request).unwrap();
        });

        let mut conn = Connection::connect(addr, true).unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(conn.peer(), addr);
        conn.send_all(b"ping").unwrap();
        conn.shutdown_write().unwrap();
        assert_eq!(conn.state(), ConnectionState::HalfClosed);
        assert_eq!(conn.receive_to_end(2).unwrap(), b"ping");
        conn.close();
        server.join().unwrap();
    }
}
