use std::io;

/// Failures reported synchronously by [`Server`](super::Server).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection capacity must be at least 1")]
    InvalidCapacity,

    #[error("failed to initialise listening socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to listen on socket: {0}")]
    Listen(#[source] io::Error),

    #[error("failed to spawn reactor thread: {0}")]
    Spawn(#[source] io::Error),
}
