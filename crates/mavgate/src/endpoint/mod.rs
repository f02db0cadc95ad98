// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint drivers: one task per transport, all speaking the same
//! contract with the router. Raw received chunks go up tagged with an
//! endpoint key, pre-framed packets come down through a bounded outbox.
//!
//! Connection-oriented transports (TCP, serial) reconnect indefinitely
//! with a fixed delay and drop outbound frames while down, so a dead link
//! never stalls the router.

pub mod serial;
pub mod tcp;
pub mod udp;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

/// Delay between reconnect attempts for connection-oriented transports.
pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Depth of each driver's outbound frame queue.
pub(crate) const OUTBOX_DEPTH: usize = 64;

/// Read chunk capacity for stream transports.
pub(crate) const READ_CHUNK: usize = 4096;

/// Receive buffer size for datagram sockets; comfortably above the largest
/// MAVLink frame.
pub(crate) const DATAGRAM_CAPACITY: usize = 2048;

/// Index of a configured connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link{}", self.0)
    }
}

/// Stable identity of an endpoint: the socket for connection-oriented
/// transports and UDP-out, socket plus source address for UDP-in peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKey {
    UdpPeer { link: LinkId, peer: SocketAddr },
    UdpOut(LinkId),
    Tcp(LinkId),
    Serial(LinkId),
}

impl EndpointKey {
    pub fn link(&self) -> LinkId {
        match self {
            Self::UdpPeer { link, .. } => *link,
            Self::UdpOut(link) | Self::Tcp(link) | Self::Serial(link) => *link,
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UdpPeer { link, peer } => write!(f, "udpin/{}:{}", link.0, peer),
            Self::UdpOut(link) => write!(f, "udpout/{}", link.0),
            Self::Tcp(link) => write!(f, "tcpout/{}", link.0),
            Self::Serial(link) => write!(f, "serial/{}", link.0),
        }
    }
}

/// Write handle of a stream-oriented link (TCP, serial, UDP-out).
#[derive(Debug, Clone)]
pub struct StreamLink {
    pub tx: mpsc::Sender<Bytes>,
}

/// Wait out the reconnect delay, discarding frames queued for the dead
/// link. Returns `false` when the router has dropped the outbox, which is
/// the signal to exit the driver task.
pub(crate) async fn idle_reconnect_wait(outbox: &mut mpsc::Receiver<Bytes>, link: LinkId) -> bool {
    let deadline = tokio::time::sleep(RECONNECT_DELAY);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => return true,
            frame = outbox.recv() => match frame {
                Some(_) => debug!(%link, "link down; outbound frame dropped"),
                None => return false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_key_links() {
        let peer: SocketAddr = "10.0.0.1:14550".parse().unwrap();
        assert_eq!(EndpointKey::UdpPeer { link: LinkId(3), peer }.link(), LinkId(3));
        assert_eq!(EndpointKey::Tcp(LinkId(1)).link(), LinkId(1));
    }

    #[test]
    fn udp_peer_keys_distinguish_peers_on_one_socket() {
        let a: SocketAddr = "10.0.0.1:14550".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:14550".parse().unwrap();
        let link = LinkId(0);
        assert_ne!(
            EndpointKey::UdpPeer { link, peer: a },
            EndpointKey::UdpPeer { link, peer: b }
        );
        assert_eq!(
            EndpointKey::UdpPeer { link, peer: a },
            EndpointKey::UdpPeer { link, peer: a }
        );
    }

    #[tokio::test]
    async fn reconnect_wait_drops_queued_frames() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Bytes::from_static(b"frame")).await.unwrap();
        let wait = tokio::spawn(async move { idle_reconnect_wait(&mut rx, LinkId(0)).await });
        tokio::time::advance(RECONNECT_DELAY).await;
        assert!(wait.await.unwrap());
    }

    #[tokio::test]
    async fn reconnect_wait_exits_when_outbox_closes() {
        let (tx, mut rx) = mpsc::channel::<Bytes>(1);
        drop(tx);
        assert!(!idle_reconnect_wait(&mut rx, LinkId(0)).await);
    }
}
