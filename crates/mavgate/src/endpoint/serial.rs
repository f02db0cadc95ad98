// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serial endpoint driver: a UART at a configured baud rate, with the same
//! buffer and reconnect discipline as TCP-out.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::{idle_reconnect_wait, EndpointKey, LinkId, StreamLink, OUTBOX_DEPTH, READ_CHUNK};
use crate::router::RouterEvent;

/// Start the serial driver task.
pub(crate) fn spawn_serial(
    link: LinkId,
    path: String,
    baud: u32,
    events: mpsc::Sender<RouterEvent>,
) -> StreamLink {
    let (tx, outbox) = mpsc::channel(OUTBOX_DEPTH);
    tokio::spawn(run(link, path, baud, events, outbox));
    StreamLink { tx }
}

async fn run(
    link: LinkId,
    path: String,
    baud: u32,
    events: mpsc::Sender<RouterEvent>,
    mut outbox: mpsc::Receiver<Bytes>,
) {
    let key = EndpointKey::Serial(link);
    loop {
        let port = match tokio_serial::new(path.as_str(), baud).open_native_async() {
            Ok(port) => {
                info!(%link, path = %path, baud, "serial endpoint opened");
                port
            }
            Err(e) => {
                debug!(%link, path = %path, error = %e, "serial open failed; retrying");
                if !idle_reconnect_wait(&mut outbox, link).await {
                    return;
                }
                continue;
            }
        };

        let (mut reader, mut writer) = tokio::io::split(port);
        let mut chunk = BytesMut::with_capacity(READ_CHUNK);
        loop {
            tokio::select! {
                read = reader.read_buf(&mut chunk) => match read {
                    Ok(0) => {
                        warn!(%link, path = %path, "serial port closed");
                        break;
                    }
                    Ok(_) => {
                        let bytes = chunk.split().freeze();
                        if events.send(RouterEvent::Inbound { key, bytes }).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(%link, path = %path, error = %e, "serial read failed");
                        break;
                    }
                },
                frame = outbox.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = writer.write_all(&frame).await {
                            debug!(%link, error = %e, "serial write failed; frame dropped");
                            break;
                        }
                    }
                    None => return,
                },
            }
        }

        if !idle_reconnect_wait(&mut outbox, link).await {
            return;
        }
    }
}
