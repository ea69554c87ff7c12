//! httpd-reactor - embeddable HTTP connection reactor
//!
//! Core library: one control thread multiplexing a bounded pool of client
//! sockets, plus the default HTTP request/response collaborators.

pub mod config;
pub mod http;
pub mod logger;
pub mod server;

pub use logger::{Level, Logger};
pub use server::{Error, Handler, Server, StartStatus};
