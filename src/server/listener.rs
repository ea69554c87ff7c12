//! Listening sockets and address encoding.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};
use std::sync::Arc;

use crate::log;
use crate::logger::{Level, Logger};
use crate::server::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

/// Encodes an endpoint for the application: the 4 address octets for IPv4
/// (including IPv4-mapped IPv6 peers), the 16 octets otherwise.
pub fn encode_address(addr: &SocketAddr) -> Vec<u8> {
    match addr.ip() {
        IpAddr::V4(ip) => ip.octets().to_vec(),
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(v4) => v4.octets().to_vec(),
            None => ip.octets().to_vec(),
        },
    }
}

/// Creates a socket of `family` bound to the wildcard address on `port`.
/// The socket is not listening yet.
pub fn bind_socket(family: Family, port: u16) -> io::Result<Socket> {
    let addr: SocketAddr = match family {
        Family::V4 => (Ipv4Addr::UNSPECIFIED, port).into(),
        Family::V6 => (Ipv6Addr::UNSPECIFIED, port).into(),
    };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    if family == Family::V6 {
        // The IPv4 listener already owns the port for v4 traffic.
        socket.set_only_v6(true)?;
    }
    socket.bind(&SockAddr::from(addr))?;
    Ok(socket)
}

/// Starts listening and converts to a non-blocking std listener.
pub fn listen(socket: Socket, backlog: i32) -> io::Result<TcpListener> {
    socket.listen(backlog)?;
    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

fn local_port(socket: &Socket) -> io::Result<u16> {
    socket
        .local_addr()?
        .as_socket()
        .map(|addr| addr.port())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an inet socket"))
}

/// The listening endpoint pair: IPv4 always, IPv6 when available.
#[derive(Debug)]
pub(crate) struct Listeners {
    pub(crate) v4: Option<TcpListener>,
    pub(crate) v6: Option<TcpListener>,
    port: u16,
}

impl Listeners {
    /// Binds and listens on `port`. A failed IPv6 bind only logs a warning;
    /// any other failure drops whatever was opened.
    pub(crate) fn open(
        port: u16,
        backlog: i32,
        ipv6: bool,
        logger: &Arc<Logger>,
    ) -> Result<Self, Error> {
        let socket4 = bind_socket(Family::V4, port).map_err(|e| {
            log!(logger, Level::Error, "Error initialising IPv4 socket: {}", e);
            Error::Socket(e)
        })?;
        let port = local_port(&socket4).map_err(Error::Socket)?;

        let socket6 = if ipv6 {
            match bind_socket(Family::V6, port) {
                Ok(socket) => Some(socket),
                Err(e) => {
                    log!(logger, Level::Warning, "Error initialising IPv6 socket: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let v4 = listen(socket4, backlog).map_err(|e| {
            log!(logger, Level::Error, "Error listening on IPv4: {}", e);
            Error::Listen(e)
        })?;

        let v6 = match socket6 {
            Some(socket) => Some(listen(socket, backlog).map_err(|e| {
                log!(logger, Level::Error, "Error listening on IPv6: {}", e);
                Error::Listen(e)
            })?),
            None => None,
        };

        log!(
            logger,
            Level::Info,
            "Server sockets initialised on port {} ({})",
            port,
            if v6.is_some() { "IPv4+IPv6" } else { "IPv4" }
        );

        Ok(Self {
            v4: Some(v4),
            v6,
            port,
        })
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn is_dual_stack(&self) -> bool {
        self.v6.is_some()
    }

    /// Closes both sockets.
    pub(crate) fn close(&mut self) {
        self.v4 = None;
        self.v6 = None;
    }
}
