use std::os::fd::RawFd;

use crate::http::request::Request;
use crate::http::response::Response;

/// Application callbacks driven by the reactor thread.
///
/// The handler itself is the context shared by every callback. Each accepted
/// connection gets its own [`Connection`](Handler::Connection) value from
/// [`on_connect`](Handler::on_connect); the reactor keeps it for as long as the
/// connection occupies a slot and hands it back to
/// [`on_disconnect`](Handler::on_disconnect) exactly once.
///
/// All three callbacks run on the reactor thread, so a slow callback stalls
/// every connection.
pub trait Handler: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Called after a connection is admitted. Addresses are encoded by
    /// [`encode_address`](super::listener::encode_address).
    fn on_connect(&self, local: &[u8], remote: &[u8]) -> Self::Connection;

    /// Called once per complete request. Returning `None` sends nothing and
    /// keeps the connection open.
    fn on_request(
        &self,
        conn: &mut Self::Connection,
        socket: RawFd,
        request: &Request,
    ) -> Option<Response>;

    /// Called when the connection leaves its slot, for whatever reason.
    fn on_disconnect(&self, conn: Self::Connection);
}
