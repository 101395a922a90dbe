//! UDP transport implementation.

use super::Transport;
use crate::error::{Error, Result, TIMEOUT_INDICATION};
use crate::util::bind_ephemeral_udp_socket;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Largest datagram an agent can send us.
const MAX_DATAGRAM: usize = 65535;

/// UDP transport for a single target.
///
/// Owns a connected socket, so datagrams from other peers are filtered by
/// the kernel.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral socket and connect it to `target`.
    pub async fn connect(target: SocketAddr, recv_buffer_size: Option<usize>) -> Result<Self> {
        let io_error = |e: std::io::Error| Error::transport(target, e.to_string());

        let socket = bind_ephemeral_udp_socket(target, recv_buffer_size).map_err(io_error)?;
        socket.connect(target).await.map_err(io_error)?;

        tracing::debug!(target: "snmp_probe::transport", { snmp.target = %target, snmp.local_addr = ?socket.local_addr().ok() }, "UDP transport connected");
        Ok(Self { socket, target })
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        tracing::trace!(target: "snmp_probe::transport", { snmp.target = %self.target, snmp.bytes = data.len() }, "UDP send");
        self.socket
            .send(data)
            .await
            .map_err(|e| Error::transport(self.target, e.to_string()))?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<Bytes> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match timeout(recv_timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                tracing::trace!(target: "snmp_probe::transport", { snmp.target = %self.target, snmp.bytes = len }, "UDP recv complete");
                Ok(Bytes::from(buf))
            }
            Ok(Err(e)) => {
                tracing::trace!(target: "snmp_probe::transport", { snmp.target = %self.target, error = %e }, "UDP recv error");
                Err(Error::transport(self.target, e.to_string()))
            }
            Err(_) => {
                tracing::trace!(target: "snmp_probe::transport", { snmp.target = %self.target, snmp.request_id = request_id }, "UDP recv timeout");
                Err(Error::transport(self.target, TIMEOUT_INDICATION))
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive_echo() {
        let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::connect(agent.local_addr().unwrap(), None)
            .await
            .unwrap();

        transport.send(b"ping").await.unwrap();
        let mut buf = [0u8; 16];
        let (len, from) = agent.recv_from(&mut buf).await.unwrap();
        agent.send_to(&buf[..len], from).await.unwrap();

        let reply = transport.recv(1, Duration::from_secs(1)).await.unwrap();
        assert_eq!(&reply[..], b"ping");
    }

    #[tokio::test]
    async fn test_recv_times_out() {
        let agent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::connect(agent.local_addr().unwrap(), None)
            .await
            .unwrap();

        let err = transport
            .recv(1, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
