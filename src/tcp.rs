//! A [`ConnectionFactory`] for raw TCP with tuned sockets.
//!
//! This is the batteries-included factory for backends reachable over a
//! plain TCP stream. Sockets are built through socket2 so keepalive,
//! Nagle, and buffer sizing can be set before connecting.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, TcpKeepalive, Type};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::factory::ConnectionFactory;

/// Socket buffer sizes for pooled connections (4MB each).
const DEFAULT_RECV_BUFFER: usize = 4 * 1024 * 1024;
const DEFAULT_SEND_BUFFER: usize = 4 * 1024 * 1024;

/// Keepalive probing starts after 60s idle, then every 10s, to catch
/// connections the backend silently dropped.
const KEEPALIVE_TIME: Duration = Duration::from_secs(60);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// TCP connection factory.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    recv_buffer: usize,
    send_buffer: usize,
}

impl TcpConnector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            recv_buffer: DEFAULT_RECV_BUFFER,
            send_buffer: DEFAULT_SEND_BUFFER,
        }
    }

    /// Override the socket buffer sizes.
    #[must_use]
    pub fn buffer_sizes(mut self, recv: usize, send: usize) -> Self {
        self.recv_buffer = recv;
        self.send_buffer = send;
        self
    }

    async fn connect_tuned(&self, addr: &str) -> Result<TcpStream> {
        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host(addr)
            .await
            .with_context(|| format!("failed to resolve {addr}"))?
            .collect();
        let socket_addr = *socket_addrs
            .first()
            .ok_or_else(|| anyhow!("no addresses found for {addr}"))?;

        let domain = if socket_addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        socket.set_recv_buffer_size(self.recv_buffer)?;
        socket.set_send_buffer_size(self.send_buffer)?;

        socket.set_keepalive(true)?;
        let keepalive = TcpKeepalive::new()
            .with_time(KEEPALIVE_TIME)
            .with_interval(KEEPALIVE_INTERVAL);
        socket.set_tcp_keepalive(&keepalive)?;

        // Low latency for request/response traffic
        socket.set_nodelay(true)?;
        socket.set_reuse_address(true)?;

        socket
            .connect(&socket_addr.into())
            .with_context(|| format!("failed to connect to {socket_addr}"))?;

        let std_stream: std::net::TcpStream = socket.into();
        std_stream.set_nonblocking(true)?;
        let stream = TcpStream::from_std(std_stream)?;

        debug!(%socket_addr, "established TCP connection");
        Ok(stream)
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionFactory for TcpConnector {
    type Connection = TcpStream;

    async fn create(&self, addr: &str) -> Result<TcpStream> {
        self.connect_tuned(addr).await
    }

    async fn close(&self, mut conn: TcpStream) -> Result<()> {
        match conn.shutdown().await {
            Ok(()) => Ok(()),
            // The peer already hung up; nothing left to shut down.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e).context("failed to shut down TCP stream"),
        }
    }
}
