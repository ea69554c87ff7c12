use nix::errno::Errno;
use nix::libc;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsFd, AsRawFd};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::http::parser::RequestParser;
use crate::http::writer::ResponseWriter;
use crate::log;
use crate::logger::{Level, Logger};
use crate::server::Handler;
use crate::server::connection::{Connection, ConnectionTable};
use crate::server::listener::{Family, Listeners, encode_address};
use crate::server::state::RunState;

/// Errors that end the loop.
#[derive(Debug, thiserror::Error)]
enum Fatal {
    #[error("readiness wait failed: {0}")]
    Poll(Errno),
    #[error("accept failed: {0}")]
    Accept(io::Error),
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Listener(Family),
    Slot(usize),
}

/// State owned by the reactor thread for one start/stop cycle.
pub(crate) struct Reactor<H: Handler> {
    logger: Arc<Logger>,
    handler: Arc<H>,
    state: RunState,
    listeners: Listeners,
    table: ConnectionTable<Connection<H::Connection>>,
    buffer: Vec<u8>,
    poll_interval_ms: u16,
    write_timeout: Option<Duration>,
}

impl<H: Handler> Reactor<H> {
    pub(crate) fn new(
        logger: Arc<Logger>,
        handler: Arc<H>,
        state: RunState,
        listeners: Listeners,
        config: &ServerConfig,
    ) -> Self {
        Self {
            logger,
            handler,
            state,
            listeners,
            table: ConnectionTable::with_capacity(config.max_connections),
            buffer: vec![0; config.recv_buffer_size.max(1)],
            poll_interval_ms: config.poll_interval_ms,
            write_timeout: config.write_timeout(),
        }
    }

    /// Runs until `running` is cleared or a fatal error occurs, then sweeps.
    pub(crate) fn run(mut self) {
        log!(
            self.logger,
            Level::Debug,
            "HTTP thread started with {} connection slots",
            self.table.capacity()
        );

        while self.state.should_run() {
            if let Err(e) = self.tick() {
                log!(self.logger, Level::Error, "HTTP thread stopping: {}", e);
                self.state.halt();
                break;
            }
        }

        self.shutdown();
    }

    fn tick(&mut self) -> Result<(), Fatal> {
        for source in self.wait()? {
            match source {
                Source::Listener(family) => self.accept(family)?,
                Source::Slot(index) => self.serve(index),
            }
        }
        Ok(())
    }

    /// Waits one tick for readable sockets. Listeners are only watched
    /// while a slot is free.
    fn wait(&self) -> Result<Vec<Source>, Fatal> {
        let mut sources = Vec::with_capacity(self.table.live() + 2);
        let mut fds = Vec::with_capacity(self.table.live() + 2);

        if !self.table.is_full() {
            let listeners = [
                (Family::V4, self.listeners.v4.as_ref()),
                (Family::V6, self.listeners.v6.as_ref()),
            ];
            for (family, listener) in listeners {
                if let Some(listener) = listener {
                    sources.push(Source::Listener(family));
                    fds.push(PollFd::new(listener.as_fd(), PollFlags::POLLIN));
                }
            }
        }

        for (index, conn) in self.table.iter() {
            sources.push(Source::Slot(index));
            fds.push(PollFd::new(conn.stream.as_fd(), PollFlags::POLLIN));
        }

        match poll(&mut fds, PollTimeout::from(self.poll_interval_ms)) {
            Ok(0) | Err(Errno::EINTR) => return Ok(Vec::new()),
            Ok(_) => {}
            Err(e) => return Err(Fatal::Poll(e)),
        }

        let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
        Ok(sources
            .into_iter()
            .zip(fds.iter())
            .filter(|(_, fd)| fd.revents().is_some_and(|r| r.intersects(readable)))
            .map(|(source, _)| source)
            .collect())
    }

    /// Accepts one pending connection from the listener of `family`.
    fn accept(&mut self, family: Family) -> Result<(), Fatal> {
        if self.table.is_full() {
            return Ok(());
        }

        let listener = match family {
            Family::V4 => self.listeners.v4.as_ref(),
            Family::V6 => self.listeners.v6.as_ref(),
        };
        let Some(listener) = listener else {
            return Ok(());
        };

        let (stream, remote) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if is_transient_accept_error(&e) => {
                log!(self.logger, Level::Debug, "Accept skipped this tick: {}", e);
                return Ok(());
            }
            Err(e) => return Err(Fatal::Accept(e)),
        };

        let local = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                log!(
                    self.logger,
                    Level::Warning,
                    "Dropping client {}: local address unavailable: {}",
                    remote,
                    e
                );
                return Ok(());
            }
        };

        log!(
            self.logger,
            Level::Info,
            "Accepted {} client on socket {}",
            match family {
                Family::V4 => "IPv4",
                Family::V6 => "IPv6",
            },
            stream.as_raw_fd()
        );

        self.admit(stream, &local, &remote);
        Ok(())
    }

    /// Places an accepted socket in a free slot, or closes it when the table
    /// filled up since the readiness set was built.
    fn admit(&mut self, stream: TcpStream, local: &SocketAddr, remote: &SocketAddr) {
        if self.table.vacant().is_none() {
            log!(
                self.logger,
                Level::Info,
                "Max connections reached, closing client {}",
                remote
            );
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        if let Err(e) = self.configure(&stream) {
            log!(
                self.logger,
                Level::Warning,
                "Error configuring socket for {}: {}",
                remote,
                e
            );
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        let context = self
            .handler
            .on_connect(&encode_address(local), &encode_address(remote));

        if let Err(conn) = self.table.insert(Connection::new(stream, context)) {
            self.handler.on_disconnect(conn.context);
            let _ = conn.stream.shutdown(Shutdown::Both);
        }
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(self.write_timeout)
    }

    /// Receives once from a readable slot and advances its exchange.
    fn serve(&mut self, index: usize) {
        let Some(conn) = self.table.get_mut(index) else {
            return;
        };
        let fd = conn.stream.as_raw_fd();
        let parser = conn.request.get_or_insert_with(RequestParser::new);

        let n = match conn.stream.read(&mut self.buffer) {
            Ok(0) => {
                log!(self.logger, Level::Debug, "Peer closed socket {}", fd);
                self.remove(index);
                return;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                return;
            }
            Err(e) => {
                log!(self.logger, Level::Info, "Error receiving on socket {}: {}", fd, e);
                self.remove(index);
                return;
            }
        };
        let data = &self.buffer[..n];

        if parser.is_empty() && data.starts_with(b"HTTP/") {
            log!(
                self.logger,
                Level::Warning,
                "Ignoring response-like data on socket {}",
                fd
            );
            return;
        }

        parser.feed(data);

        if let Some(name) = parser.error_name() {
            log!(
                self.logger,
                Level::Info,
                "Error parsing request on socket {}: {}",
                fd,
                name
            );
            self.remove(index);
            return;
        }

        if parser.is_complete() {
            self.dispatch(index);
        }
    }

    /// Hands completed requests to the application and writes the replies.
    /// Bytes received past a request start the next exchange.
    fn dispatch(&mut self, index: usize) {
        loop {
            let Some(conn) = self.table.get_mut(index) else {
                return;
            };
            let fd = conn.stream.as_raw_fd();
            let Some((request, rest)) = conn.request.take().and_then(RequestParser::finish) else {
                return;
            };

            log!(
                self.logger,
                Level::Debug,
                "{} {} on socket {}",
                request.method.as_str(),
                request.path,
                fd
            );

            if let Some(response) = self.handler.on_request(&mut conn.context, fd, &request) {
                let mut writer = ResponseWriter::new(&response);
                match writer.write_to(&mut conn.stream) {
                    Ok(()) => log!(
                        self.logger,
                        Level::Debug,
                        "Sent {} bytes on socket {} in {} writes",
                        writer.len(),
                        fd,
                        writer.attempts()
                    ),
                    Err(e) => log!(
                        self.logger,
                        Level::Warning,
                        "Error writing response on socket {} after {} of {} bytes: {}",
                        fd,
                        writer.written(),
                        writer.len(),
                        e
                    ),
                }

                if response.should_disconnect() {
                    self.remove(index);
                    return;
                }
            }

            if rest.is_empty() {
                return;
            }

            let mut next = RequestParser::new();
            next.feed(&rest);

            if let Some(name) = next.error_name() {
                log!(
                    self.logger,
                    Level::Info,
                    "Error parsing request on socket {}: {}",
                    fd,
                    name
                );
                self.remove(index);
                return;
            }

            let complete = next.is_complete();
            conn.request = Some(next);
            if !complete {
                return;
            }
        }
    }

    /// Tears down the connection in `index`. A free slot is left alone.
    fn remove(&mut self, index: usize) {
        let Some(conn) = self.table.remove(index) else {
            return;
        };
        let Connection {
            stream,
            context,
            request,
        } = conn;
        let fd = stream.as_raw_fd();

        drop(request);
        self.handler.on_disconnect(context);
        let _ = stream.shutdown(Shutdown::Write);
        drop(stream);

        log!(
            self.logger,
            Level::Debug,
            "Removed connection on socket {}, {} live",
            fd,
            self.table.live()
        );
    }

    fn shutdown(&mut self) {
        let occupied: Vec<usize> = self.table.occupied().collect();
        for index in occupied {
            self.remove(index);
        }

        self.listeners.close();
        log!(self.logger, Level::Info, "Exiting HTTP thread");
    }
}

fn is_transient_accept_error(e: &io::Error) -> bool {
    match e.kind() {
        io::ErrorKind::WouldBlock
        | io::ErrorKind::Interrupted
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => true,
        _ => matches!(
            e.raw_os_error(),
            Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM | libc::EPROTO)
        ),
    }
}
