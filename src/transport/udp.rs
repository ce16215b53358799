//! UDP transport for DNS queries.
//!
//! One receive loop reads datagrams off the listening socket; each
//! decodable query is handled in its own task so a slow upstream round trip
//! never stalls the socket. Replies go back out through the same socket.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, error};

use crate::resolver::Resolver;
use crate::upstream::Upstream;
use crate::wire;

use super::MAX_DNS_PACKET_SIZE;

const DNS_HEADER_LEN: usize = 12;

/// UDP transport for the DNS proxy.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive loop: decode each datagram and spawn a task that resolves it
    /// and writes the reply back to the originator.
    ///
    /// Datagrams shorter than a DNS header or that fail to decode are
    /// dropped. Runs until the socket errors persistently.
    pub async fn run<U>(self, resolver: Arc<Resolver<U>>) -> io::Result<()>
    where
        U: Upstream + 'static,
    {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

        loop {
            let (len, src) = match self.socket.recv_from(&mut buf).await {
                Ok(r) => r,
                Err(e) => {
                    error!(error = %e, "UDP recv error");
                    continue;
                }
            };

            if len < DNS_HEADER_LEN {
                continue;
            }

            let query = match wire::decode(&buf[..len]) {
                Ok(message) => message,
                Err(e) => {
                    debug!(error = %e, from = %src, "undecodable datagram, dropping");
                    continue;
                }
            };

            let socket = self.socket.clone();
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let Some(reply) = resolver.resolve(&query).await else {
                    return;
                };
                match wire::encode(&reply) {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, src).await {
                            error!(error = %e, to = %src, "UDP send error");
                        }
                    }
                    Err(e) => error!(error = %e, "failed to encode reply"),
                }
            });
        }
    }
}
