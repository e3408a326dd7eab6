//! Scripted TCP peer for exercising exchanges over real sockets.
//!
//! Every accepted connection is served on its own task according to one
//! `Behavior`. All behaviors read the client's request to end-of-stream
//! before closing, so the peer never closes with unread data and the client
//! sees a clean FIN rather than a reset.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Read the request to EOF, write it back, close.
    Echo,
    /// Read the request to EOF, close without writing.
    Silent,
    /// Write these bytes before reading anything, then close once the
    /// request is drained. The reply is cut short: nothing else follows.
    Partial(Vec<u8>),
    /// Read the request to EOF, write a fixed reply, close.
    Fixed(Vec<u8>),
}

impl Behavior {
    /// Parse a mode name (`echo`, `silent`, `partial`, `fixed`). `reply` is
    /// used by the modes that write one.
    pub fn from_mode(mode: &str, reply: Vec<u8>) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "echo" => Some(Behavior::Echo),
            "silent" => Some(Behavior::Silent),
            "partial" => Some(Behavior::Partial(reply)),
            "fixed" => Some(Behavior::Fixed(reply)),
            _ => None,
        }
    }
}

/// Accept connections forever, serving each with `behavior`.
pub async fn run(listener: TcpListener, behavior: Behavior) -> Result<(), io::Error> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let behavior = behavior.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(stream, &behavior).await {
                warn!(%peer, error = %e, "connection failed");
            }
        });
    }
}

async fn serve(mut stream: TcpStream, behavior: &Behavior) -> Result<(), io::Error> {
    let mut request = Vec::new();
    match behavior {
        Behavior::Echo => {
            stream.read_to_end(&mut request).await?;
            stream.write_all(&request).await?;
        }
        Behavior::Silent => {
            stream.read_to_end(&mut request).await?;
        }
        Behavior::Partial(reply) => {
            stream.write_all(reply).await?;
            stream.read_to_end(&mut request).await?;
        }
        Behavior::Fixed(reply) => {
            stream.read_to_end(&mut request).await?;
            stream.write_all(reply).await?;
        }
    }
    debug!(?behavior, request_len = request.len(), "served");
    stream.shutdown().await
}

/// Start a peer on an ephemeral loopback port in a background thread and
/// return its address. The peer lives until the process exits.
pub fn spawn(behavior: Behavior) -> Result<SocketAddr, io::Error> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::spawn(move || {
        let result = rt.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            run(listener, behavior).await
        });
        if let Err(e) = result {
            error!(%addr, error = %e, "mock peer stopped");
        }
    });
    Ok(addr)
}
