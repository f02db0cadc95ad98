// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP-out endpoint driver: a client connection to a remote MAVLink
//! server, reconnecting forever on failure.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{idle_reconnect_wait, EndpointKey, LinkId, StreamLink, OUTBOX_DEPTH, READ_CHUNK};
use crate::router::RouterEvent;

/// Start the `tcpout` driver task.
pub(crate) fn spawn_tcp_out(
    link: LinkId,
    target: SocketAddr,
    events: mpsc::Sender<RouterEvent>,
) -> StreamLink {
    let (tx, outbox) = mpsc::channel(OUTBOX_DEPTH);
    tokio::spawn(run(link, target, events, outbox));
    StreamLink { tx }
}

async fn run(
    link: LinkId,
    target: SocketAddr,
    events: mpsc::Sender<RouterEvent>,
    mut outbox: mpsc::Receiver<Bytes>,
) {
    let key = EndpointKey::Tcp(link);
    loop {
        let stream = match TcpStream::connect(target).await {
            Ok(stream) => {
                info!(%link, %target, "tcp endpoint connected");
                stream
            }
            Err(e) => {
                debug!(%link, %target, error = %e, "tcp connect failed; retrying");
                if !idle_reconnect_wait(&mut outbox, link).await {
                    return;
                }
                continue;
            }
        };

        let (mut reader, mut writer) = stream.into_split();
        let mut chunk = BytesMut::with_capacity(READ_CHUNK);
        loop {
            tokio::select! {
                read = reader.read_buf(&mut chunk) => match read {
                    Ok(0) => {
                        warn!(%link, %target, "tcp endpoint closed by peer");
                        break;
                    }
                    Ok(_) => {
                        let bytes = chunk.split().freeze();
                        if events.send(RouterEvent::Inbound { key, bytes }).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(%link, %target, error = %e, "tcp read failed");
                        break;
                    }
                },
                frame = outbox.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = writer.write_all(&frame).await {
                            debug!(%link, error = %e, "tcp write failed; frame dropped");
                            break;
                        }
                    }
                    None => return, // router gone
                },
            }
        }

        if !idle_reconnect_wait(&mut outbox, link).await {
            return;
        }
    }
}
