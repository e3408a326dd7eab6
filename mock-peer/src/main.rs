use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mock_peer::Behavior;

/// Log to stderr, filtered by `RUST_LOG` (default `info`), JSON when
/// `LOG_FORMAT=json`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mode = std::env::var("PEER_MODE").unwrap_or_else(|_| "echo".to_string());
    let reply = std::env::var("PEER_REPLY").unwrap_or_default();
    let behavior = Behavior::from_mode(&mode, reply.into_bytes())
        .with_context(|| format!("unknown PEER_MODE {mode:?}"))?;

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, ?behavior, "listening");
    mock_peer::run(listener, behavior).await?;
    Ok(())
}
