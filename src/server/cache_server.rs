//! Cache Server
//!
//! Binds the client-facing socket and the upstream socket, feeds every
//! datagram through the shared [`CacheNode`] and performs the resulting
//! effects once the node lock is released.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::cache::Effect;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::Frame;
use crate::server::{SharedNode, MAX_DATAGRAM};

/// UDP cache front end.
pub struct CacheServer {
    client_socket: Arc<UdpSocket>,
    origin_socket: Arc<UdpSocket>,
    origin_addr: SocketAddr,
    node: SharedNode,
    object_size: usize,
}

impl CacheServer {
    /// Binds the client socket on `listen_addr` and an ephemeral socket
    /// connected to `origin_addr`.
    pub async fn bind(config: &Config, node: SharedNode) -> Result<Self> {
        let client_socket = UdpSocket::bind(config.listen_addr).await?;

        let upstream_bind = match config.origin_addr.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let origin_socket = UdpSocket::bind(upstream_bind).await?;
        origin_socket.connect(config.origin_addr).await?;

        Ok(Self {
            client_socket: Arc::new(client_socket),
            origin_socket: Arc::new(origin_socket),
            origin_addr: config.origin_addr,
            node,
            object_size: config.object_size,
        })
    }

    /// Address clients should send requests to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.client_socket.local_addr()?)
    }

    /// Serves clients and origin replies until a fatal fault occurs.
    ///
    /// Socket read failures and malformed frames are logged and skipped; only
    /// forward id exhaustion ends the loop. Forwards that cannot reach the
    /// origin are released without a client reply.
    pub async fn run(&self) -> Result<()> {
        info!(
            listen = %self.local_addr()?,
            origin = %self.origin_addr,
            "Cache server running"
        );
        tokio::try_join!(self.serve_clients(), self.serve_origin())?;
        Ok(())
    }

    async fn serve_clients(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match self.client_socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    warn!(error = %err, "client socket read failed");
                    continue;
                }
            };

            let effect = {
                let mut node = self.node.write().await;
                match Frame::decode(&buf[..len]) {
                    Ok(frame) => node.on_client_request(from, frame, Instant::now())?,
                    Err(err) => {
                        node.on_malformed(&from, &err);
                        continue;
                    }
                }
            };
            self.perform(effect).await;
        }
    }

    async fn serve_origin(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let len = match self.origin_socket.recv(&mut buf).await {
                Ok(len) => len,
                // ICMP port unreachable from the connected origin
                Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                    self.node.write().await.on_origin_unreachable();
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, "origin socket read failed");
                    continue;
                }
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            let effect = {
                let mut node = self.node.write().await;
                match Frame::decode(&data) {
                    Ok(frame) => {
                        let payload = data.slice(frame.wire_len()..);
                        node.on_origin_reply(frame, payload, Instant::now())
                    }
                    Err(err) => {
                        node.on_malformed(&self.origin_addr, &err);
                        None
                    }
                }
            };
            if let Some(effect) = effect {
                self.perform(effect).await;
            }
        }
    }

    async fn perform(&self, effect: Effect<SocketAddr>) {
        match effect {
            Effect::Forward { frame } => {
                let bytes = match frame.encode(self.object_size) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(error = %err, key = %frame.key, "cannot encode forward");
                        self.node.write().await.on_forward_failed(frame.request_id);
                        return;
                    }
                };
                match self.origin_socket.send(&bytes).await {
                    Ok(_) => {}
                    // a refused send carries the ICMP error of an earlier forward
                    Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                        self.node.write().await.on_origin_unreachable();
                    }
                    Err(err) => {
                        warn!(error = %err, forward_id = frame.request_id, "forward to origin failed");
                        self.node.write().await.on_forward_failed(frame.request_id);
                    }
                }
            }
            Effect::Reply { to, frame, delay } => {
                let bytes = match frame.encode(self.object_size) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(error = %err, client = %to, "cannot encode reply");
                        return;
                    }
                };
                if delay.is_zero() {
                    send_reply(&self.client_socket, bytes, to).await;
                } else {
                    let socket = self.client_socket.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        send_reply(&socket, bytes, to).await;
                    });
                }
            }
        }
    }
}

async fn send_reply(socket: &UdpSocket, bytes: Bytes, to: SocketAddr) {
    match socket.send_to(&bytes, to).await {
        Ok(_) => debug!(client = %to, "reply sent"),
        Err(err) => warn!(error = %err, client = %to, "reply to client failed"),
    }
}
