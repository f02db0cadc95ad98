// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP endpoint drivers.
//!
//! `udpin` binds a local address and learns peers from the source address
//! of whatever arrives, so several GCS instances can multiplex on one
//! socket. `udpout` binds an ephemeral port and aims every write at the
//! configured target; datagrams coming back on that socket are received
//! symmetrically, keyed by the link itself.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{EndpointKey, LinkId, StreamLink, DATAGRAM_CAPACITY, OUTBOX_DEPTH};
use crate::router::RouterEvent;

/// Write handle and bind address of a `udpin` link. Writes carry the peer
/// address because one socket serves many learned peers.
#[derive(Debug, Clone)]
pub struct UdpInLink {
    pub local_addr: SocketAddr,
    pub tx: mpsc::Sender<(SocketAddr, Bytes)>,
}

/// Bind a UDP socket with `SO_REUSEADDR`, so a restarted router can rebind
/// a port still in the kernel's grace period.
fn bind_udp(bind: SocketAddr) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind.into())?;
    Ok(socket.into())
}

/// Bind `udpin` and start its receive and send loops.
pub(crate) async fn spawn_udp_in(
    link: LinkId,
    bind: SocketAddr,
    events: mpsc::Sender<RouterEvent>,
) -> io::Result<UdpInLink> {
    let socket = UdpSocket::from_std(bind_udp(bind)?)?;
    let local_addr = socket.local_addr()?;
    let socket = Arc::new(socket);
    let (tx, mut outbox) = mpsc::channel::<(SocketAddr, Bytes)>(OUTBOX_DEPTH);

    let recv_socket = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut buf = vec![0u8; DATAGRAM_CAPACITY];
        loop {
            match recv_socket.recv_from(&mut buf).await {
                Ok((n, peer)) => {
                    let event = RouterEvent::Inbound {
                        key: EndpointKey::UdpPeer { link, peer },
                        bytes: Bytes::copy_from_slice(&buf[..n]),
                    };
                    if events.send(event).await.is_err() {
                        return; // router gone
                    }
                }
                Err(e) => warn!(%link, error = %e, "udp receive failed"),
            }
        }
    });

    tokio::spawn(async move {
        while let Some((peer, frame)) = outbox.recv().await {
            if peer == local_addr {
                debug!(%link, %peer, "refusing to send to own bind address");
                continue;
            }
            if let Err(e) = socket.send_to(&frame, peer).await {
                debug!(%link, %peer, error = %e, "udp write failed; frame dropped");
            }
        }
    });

    Ok(UdpInLink { local_addr, tx })
}

/// Write handle and bind address of a `udpout` link.
#[derive(Debug, Clone)]
pub struct UdpOutLink {
    pub local_addr: SocketAddr,
    pub stream: StreamLink,
}

/// Open `udpout` on an ephemeral port and start its loops.
pub(crate) async fn spawn_udp_out(
    link: LinkId,
    target: SocketAddr,
    events: mpsc::Sender<RouterEvent>,
) -> io::Result<UdpOutLink> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
    let local_addr = socket.local_addr()?;
    let socket = Arc::new(socket);
    let (tx, mut outbox) = mpsc::channel::<Bytes>(OUTBOX_DEPTH);

    let recv_socket = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut buf = vec![0u8; DATAGRAM_CAPACITY];
        loop {
            match recv_socket.recv_from(&mut buf).await {
                Ok((n, _peer)) => {
                    let event = RouterEvent::Inbound {
                        key: EndpointKey::UdpOut(link),
                        bytes: Bytes::copy_from_slice(&buf[..n]),
                    };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(%link, error = %e, "udp receive failed"),
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if let Err(e) = socket.send_to(&frame, target).await {
                debug!(%link, %target, error = %e, "udp write failed; frame dropped");
            }
        }
    });

    Ok(UdpOutLink {
        local_addr,
        stream: StreamLink { tx },
    })
}
