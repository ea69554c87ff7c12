use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use httpd_reactor::config::Config;
use httpd_reactor::http::request::Request;
use httpd_reactor::http::response::{Response, ResponseBuilder, StatusCode};
use httpd_reactor::{Handler, Logger, Server, StartStatus};

/// Greets every request and counts them per connection.
#[derive(Default)]
struct Greeter {
    total: AtomicU64,
}

struct Session {
    peer: Vec<u8>,
    requests: u64,
}

impl Handler for Greeter {
    type Connection = Session;

    fn on_connect(&self, _local: &[u8], remote: &[u8]) -> Session {
        Session {
            peer: remote.to_vec(),
            requests: 0,
        }
    }

    fn on_request(&self, conn: &mut Session, _socket: RawFd, request: &Request) -> Option<Response> {
        conn.requests += 1;
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        let body = format!(
            "Hello from httpd-reactor\nrequest {} on this connection, {} overall\n",
            conn.requests, total
        );

        Some(
            ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", "text/plain")
                .body(body.into_bytes())
                .disconnect(!request.keep_alive())
                .build(),
        )
    }

    fn on_disconnect(&self, conn: Session) {
        tracing::debug!(peer = ?conn.peer, requests = conn.requests, "Session closed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let cfg = Config::load()?;
    let logger = Arc::new(Logger::with_level(cfg.logging.level));
    let server = Server::with_config(logger, Greeter::default(), &cfg.server)?;

    match server.start(cfg.server.port)? {
        StartStatus::Listening { port, dual_stack } => {
            tracing::info!(port, dual_stack, "Listening");
        }
        StartStatus::AlreadyRunning => tracing::warn!("Server was already running"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tokio::task::spawn_blocking(move || server.stop()).await?;

    Ok(())
}
