//! Origin Responder
//!
//! Stand-in origin: answers every frame it receives with the same id and key
//! after a fixed delay, padded to the configured object size.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::Frame;
use crate::server::MAX_DATAGRAM;

pub struct OriginServer {
    socket: Arc<UdpSocket>,
    delay: Duration,
    object_size: usize,
}

impl OriginServer {
    pub async fn bind(addr: SocketAddr, delay: Duration, object_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            delay,
            object_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Answers requests forever. Each answer is sent from its own task so a
    /// slow origin still accepts new requests while earlier ones wait.
    pub async fn run(&self) -> Result<()> {
        info!(listen = %self.local_addr()?, delay = ?self.delay, "Origin server running");

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    warn!(error = %err, "origin read failed");
                    continue;
                }
            };

            let frame = match Frame::decode(&buf[..len]) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, peer = %from, "dropping malformed request");
                    continue;
                }
            };
            let bytes = match frame.encode(self.object_size) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(error = %err, "cannot encode origin reply");
                    continue;
                }
            };

            let socket = self.socket.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match socket.send_to(&bytes, from).await {
                    Ok(_) => debug!(id = frame.request_id, key = %frame.key, "origin answered"),
                    Err(err) => warn!(error = %err, peer = %from, "origin reply failed"),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_origin_echoes_id_and_key_with_padding() {
        let origin = OriginServer::bind("127.0.0.1:0".parse().unwrap(), Duration::ZERO, 32)
            .await
            .unwrap();
        let addr = origin.local_addr().unwrap();
        let server = tokio::spawn(async move { origin.run().await });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let request = Frame::new(77, "/svc/seg-1").encode(0).unwrap();
        client.send_to(&request, addr).await.unwrap();

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        let reply = Frame::decode(&buf[..len]).unwrap();
        assert_eq!(reply, Frame::new(77, "/svc/seg-1"));
        assert_eq!(len, reply.wire_len() + 32);

        server.abort();
    }
}
