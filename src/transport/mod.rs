//! Transport layer abstraction.
//!
//! The engine talks to agents through [`Transport`]; [`UdpTransport`] is
//! the real thing and [`MockTransport`] scripts replies for tests.

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Client-side datagram transport to one agent.
pub trait Transport: Send + Sync {
    /// Send request data to the target.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next datagram from the target.
    ///
    /// `request_id` is only used for logging and mock correlation; the
    /// engine checks the reply itself. A timeout surfaces as
    /// [`Error::Transport`](crate::Error::Transport) carrying
    /// [`TIMEOUT_INDICATION`](crate::error::TIMEOUT_INDICATION).
    fn recv(&self, request_id: i32, timeout: Duration)
    -> impl Future<Output = Result<Bytes>> + Send;

    /// The peer address for this transport.
    fn peer_addr(&self) -> SocketAddr;
}
