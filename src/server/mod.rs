//! The connection reactor and its lifecycle.
//!
//! A [`Server`] owns the configuration and the application [`Handler`]. On
//! [`start`](Server::start) it opens the listening sockets and moves them,
//! together with a fresh connection table, into a dedicated reactor thread.
//! From then on only that thread touches sockets or per-connection state; the
//! controlling side shares nothing with it except the run flags.
//!
//! # Example
//!
//! ```no_run
//! use std::os::fd::RawFd;
//! use std::sync::Arc;
//! use httpd_reactor::http::{request::Request, response::Response};
//! use httpd_reactor::{Handler, Logger, Server};
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     type Connection = ();
//!
//!     fn on_connect(&self, _local: &[u8], _remote: &[u8]) {}
//!
//!     fn on_request(&self, _conn: &mut (), _socket: RawFd, _req: &Request) -> Option<Response> {
//!         Some(Response::ok("hello\n"))
//!     }
//!
//!     fn on_disconnect(&self, _conn: ()) {}
//! }
//!
//! # fn main() -> Result<(), httpd_reactor::Error> {
//! let server = Server::new(Arc::new(Logger::new()), Hello, 16)?;
//! server.start(8080)?;
//! // ...
//! server.stop();
//! # Ok(())
//! # }
//! ```

mod connection;
pub mod error;
pub mod handler;
pub mod listener;
mod reactor;
mod state;

pub use error::Error;
pub use handler::Handler;

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::config::ServerConfig;
use crate::log;
use crate::logger::{Level, Logger};
use listener::Listeners;
use reactor::Reactor;
use state::RunState;

/// Outcome of a successful [`Server::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// Sockets are listening and the reactor thread is running.
    Listening { port: u16, dual_stack: bool },
    /// The reactor was already running (or not yet reaped); nothing changed.
    AlreadyRunning,
}

pub struct Server<H: Handler> {
    logger: Arc<Logger>,
    handler: Arc<H>,
    config: ServerConfig,
    state: RunState,
    /// Also serialises start/stop against each other.
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<H: Handler> Server<H> {
    /// Creates an idle server with default settings and room for
    /// `max_connections` concurrent clients.
    pub fn new(logger: Arc<Logger>, handler: H, max_connections: usize) -> Result<Self, Error> {
        let config = ServerConfig {
            max_connections,
            ..ServerConfig::default()
        };
        Self::with_config(logger, handler, &config)
    }

    pub fn with_config(logger: Arc<Logger>, handler: H, config: &ServerConfig) -> Result<Self, Error> {
        if config.max_connections == 0 {
            return Err(Error::InvalidCapacity);
        }

        Ok(Self {
            logger,
            handler: Arc::new(handler),
            config: config.clone(),
            state: RunState::new(),
            thread: Mutex::new(None),
        })
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    /// Opens the listeners on `port` and spawns the reactor thread.
    ///
    /// Does nothing unless the server is idle. Port 0 binds an ephemeral
    /// port, reported in [`StartStatus::Listening`].
    pub fn start(&self, port: u16) -> Result<StartStatus, Error> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.state.is_idle() {
            return Ok(StartStatus::AlreadyRunning);
        }

        let listeners = Listeners::open(port, self.config.backlog, self.config.ipv6, &self.logger)?;
        let status = StartStatus::Listening {
            port: listeners.port(),
            dual_stack: listeners.is_dual_stack(),
        };

        self.state.activate();
        let reactor = Reactor::new(
            Arc::clone(&self.logger),
            Arc::clone(&self.handler),
            self.state.clone(),
            listeners,
            &self.config,
        );

        let spawned = thread::Builder::new()
            .name("httpd-reactor".to_string())
            .spawn(move || reactor.run());

        match spawned {
            Ok(handle) => {
                *thread = Some(handle);
                Ok(status)
            }
            Err(e) => {
                log!(self.logger, Level::Error, "Error spawning HTTP thread: {}", e);
                self.state.mark_joined();
                Err(Error::Spawn(e))
            }
        }
    }

    /// True from a successful start until `stop` has joined the thread,
    /// including after the reactor exited on a fatal error.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Signals the reactor and blocks until it has closed every connection
    /// and exited. Idempotent.
    pub fn stop(&self) {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.state.begin_stop() {
            return;
        }

        if let Some(handle) = thread.take() {
            if handle.join().is_err() {
                log!(self.logger, Level::Error, "HTTP thread panicked");
            }
        }

        self.state.mark_joined();
    }
}

impl<H: Handler> Drop for Server<H> {
    fn drop(&mut self) {
        self.stop();
    }
}
