// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The router core.
//!
//! One task owns all endpoint, route, and subscription state; drivers and
//! API callers reach it through a single bounded event channel, which
//! gives a total order on state transitions without locks. Frame ordering
//! per endpoint matches arrival order because fan-out completes before the
//! next event is taken.

pub mod routes;
pub mod subscription;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ConnectionSpec, RouterConfig};
use crate::dialect::{Dialect, MavMessage};
use crate::endpoint::{udp, EndpointKey, LinkId};
use crate::protocol::{self, codec, Frame, FrameError, MavVersion, RawFrame};

pub use routes::RouteTable;
pub use subscription::{
    subscriber_channel, Delivery, Query, ReceivedMessage, SubscriberHandle, SubscriberId,
    Subscription, SubscriptionStore,
};

use subscription::SubscriptionRegistry;

/// Depth of the router's inbound event channel.
const EVENT_CHANNEL_DEPTH: usize = 256;

/// How long a forward may wait on a congested driver outbox before the
/// frame is dropped. Bounds the backpressure a stalled endpoint can apply
/// to the router, which also keeps a stalled driver from deadlocking
/// against a full event channel.
const WRITE_STALL_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(100);

/// Router API errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message id {0} is not in the loaded dialect")]
    InvalidMessage(u32),

    #[error("message id {0} cannot be carried by MAVLink v1")]
    ProtocolUndefined(u32),

    #[error("router task is not running")]
    NotRunning,
}

/// Events and commands processed by the router task.
#[derive(Debug)]
pub(crate) enum RouterEvent {
    /// Raw bytes received by a driver, tagged with their endpoint.
    Inbound { key: EndpointKey, bytes: Bytes },
    /// Pack and route a locally originated message.
    Send {
        message: MavMessage,
        version: MavVersion,
        reply: oneshot::Sender<Result<(), RouterError>>,
    },
    Subscribe {
        query: Query,
        handle: SubscriberHandle,
        reply: oneshot::Sender<Result<(), RouterError>>,
    },
    Unsubscribe { subscriber: SubscriberId },
    SubscriberClosed { subscriber: SubscriberId },
    Shutdown,
}

/// Counters published by the router task. Relaxed atomics; consumers only
/// need monotonic snapshots.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    pub frames_received: AtomicU64,
    pub frames_forwarded: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub checksum_errors: AtomicU64,
    pub unknown_messages: AtomicU64,
    pub bytes_forwarded: AtomicU64,
    pub local_deliveries: AtomicU64,
    pub messages_sent: AtomicU64,
}

/// Point-in-time copy of [`RouterMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_forwarded: u64,
    pub frames_dropped: u64,
    pub checksum_errors: u64,
    pub unknown_messages: u64,
    pub bytes_forwarded: u64,
    pub local_deliveries: u64,
    pub messages_sent: u64,
}

impl RouterMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            unknown_messages: self.unknown_messages.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            local_deliveries: self.local_deliveries.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
        }
    }
}

/// Cloneable handle for talking to a running router.
#[derive(Clone)]
pub struct RouterHandle {
    events: mpsc::Sender<RouterEvent>,
    metrics: Arc<RouterMetrics>,
    udp_addrs: Arc<Vec<(LinkId, SocketAddr)>>,
}

impl RouterHandle {
    /// Pack `message` as MAVLink v2 and route it.
    pub async fn send(&self, message: MavMessage) -> Result<(), RouterError> {
        self.send_versioned(message, MavVersion::V2).await
    }

    /// Pack `message` with an explicit wire version and route it.
    pub async fn send_versioned(
        &self,
        message: MavMessage,
        version: MavVersion,
    ) -> Result<(), RouterError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(RouterEvent::Send { message, version, reply })
            .await
            .map_err(|_| RouterError::NotRunning)?;
        rx.await.map_err(|_| RouterError::NotRunning)?
    }

    /// Register `query` for `handle`. Fails with `InvalidMessage` when the
    /// query names a message id outside the loaded dialect.
    pub async fn subscribe(
        &self,
        query: Query,
        handle: SubscriberHandle,
    ) -> Result<(), RouterError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(RouterEvent::Subscribe { query, handle, reply })
            .await
            .map_err(|_| RouterError::NotRunning)?;
        rx.await.map_err(|_| RouterError::NotRunning)?
    }

    /// Remove every subscription held by `subscriber`.
    pub async fn unsubscribe(&self, subscriber: SubscriberId) -> Result<(), RouterError> {
        self.events
            .send(RouterEvent::Unsubscribe { subscriber })
            .await
            .map_err(|_| RouterError::NotRunning)
    }

    /// Stop the router task. Drivers observe the closed channel and exit.
    pub async fn shutdown(&self) {
        let _ = self.events.send(RouterEvent::Shutdown).await;
    }

    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }

    /// Local bind addresses of the UDP links, in configuration order.
    pub fn udp_addrs(&self) -> &[(LinkId, SocketAddr)] {
        &self.udp_addrs
    }
}

/// Write path of an endpoint plus its stream reassembly state.
#[derive(Debug)]
struct EndpointRecord {
    writer: EndpointWriter,
    /// Rolling receive buffer; stream transports only. Datagram endpoints
    /// parse each datagram standalone.
    rx_buf: Option<BytesMut>,
}

#[derive(Debug)]
enum EndpointWriter {
    /// Shared `udpin` socket; the peer address selects the recipient.
    Datagram {
        tx: mpsc::Sender<(SocketAddr, Bytes)>,
        peer: SocketAddr,
    },
    /// Fixed-destination link (udpout, tcpout, serial).
    Stream { tx: mpsc::Sender<Bytes> },
}

enum ForwardOutcome {
    Sent,
    /// The outbox stayed full past the stall deadline; frame dropped.
    Stalled,
    /// The driver task is gone.
    Closed,
}

impl EndpointWriter {
    async fn forward(&self, frame: Bytes) -> ForwardOutcome {
        match self {
            Self::Datagram { tx, peer } => {
                match tx.send_timeout((*peer, frame), WRITE_STALL_TIMEOUT).await {
                    Ok(()) => ForwardOutcome::Sent,
                    Err(SendTimeoutError::Timeout(_)) => ForwardOutcome::Stalled,
                    Err(SendTimeoutError::Closed(_)) => ForwardOutcome::Closed,
                }
            }
            Self::Stream { tx } => match tx.send_timeout(frame, WRITE_STALL_TIMEOUT).await {
                Ok(()) => ForwardOutcome::Sent,
                Err(SendTimeoutError::Timeout(_)) => ForwardOutcome::Stalled,
                Err(SendTimeoutError::Closed(_)) => ForwardOutcome::Closed,
            },
        }
    }
}

/// The router task state, exclusively owned by the event loop.
pub struct Router {
    dialect: &'static Dialect,
    system_id: u8,
    component_id: u8,
    endpoints: HashMap<EndpointKey, EndpointRecord>,
    udp_in_links: HashMap<LinkId, udp::UdpInLink>,
    routes: RouteTable,
    subscriptions: SubscriptionRegistry,
    store: SubscriptionStore,
    sequence: u8,
    metrics: Arc<RouterMetrics>,
    events: mpsc::Sender<RouterEvent>,
}

impl Router {
    /// Create all configured endpoints eagerly and start the router task.
    ///
    /// UDP sockets are bound here, so bind failures surface as startup
    /// errors; connection-oriented transports connect in their own tasks
    /// and retry every second, indefinitely. Subscriptions surviving in
    /// `store` are re-registered before the first event is processed.
    pub async fn spawn(
        config: RouterConfig,
        store: SubscriptionStore,
    ) -> Result<RouterHandle, RouterError> {
        config.validate()?;
        let dialect = config.dialect()?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let metrics = Arc::new(RouterMetrics::default());

        let mut endpoints = HashMap::new();
        let mut udp_in_links = HashMap::new();
        let mut udp_addrs = Vec::new();

        for (index, connection) in config.connections.iter().enumerate() {
            let link = LinkId(index);
            match connection {
                ConnectionSpec::UdpIn { bind } => {
                    let l = udp::spawn_udp_in(link, *bind, events_tx.clone()).await?;
                    info!(%link, addr = %l.local_addr, "udpin endpoint bound");
                    udp_addrs.push((link, l.local_addr));
                    udp_in_links.insert(link, l);
                }
                ConnectionSpec::UdpOut { target } => {
                    let l = udp::spawn_udp_out(link, *target, events_tx.clone()).await?;
                    info!(%link, addr = %l.local_addr, %target, "udpout endpoint open");
                    udp_addrs.push((link, l.local_addr));
                    endpoints.insert(
                        EndpointKey::UdpOut(link),
                        EndpointRecord {
                            writer: EndpointWriter::Stream { tx: l.stream.tx },
                            rx_buf: None,
                        },
                    );
                }
                ConnectionSpec::TcpOut { target } => {
                    let l = crate::endpoint::tcp::spawn_tcp_out(link, *target, events_tx.clone());
                    endpoints.insert(
                        EndpointKey::Tcp(link),
                        EndpointRecord {
                            writer: EndpointWriter::Stream { tx: l.tx },
                            rx_buf: Some(BytesMut::new()),
                        },
                    );
                }
                ConnectionSpec::Serial { path, baud } => {
                    let l = crate::endpoint::serial::spawn_serial(
                        link,
                        path.clone(),
                        *baud,
                        events_tx.clone(),
                    );
                    endpoints.insert(
                        EndpointKey::Serial(link),
                        EndpointRecord {
                            writer: EndpointWriter::Stream { tx: l.tx },
                            rx_buf: Some(BytesMut::new()),
                        },
                    );
                }
            }
        }

        let mut router = Router {
            dialect,
            system_id: config.system_id,
            component_id: config.component_id,
            endpoints,
            udp_in_links,
            routes: RouteTable::new(),
            subscriptions: SubscriptionRegistry::default(),
            store: store.clone(),
            sequence: 0,
            metrics: Arc::clone(&metrics),
            events: events_tx.clone(),
        };

        let surviving = store.load().await;
        if !surviving.is_empty() {
            info!(count = surviving.len(), "restored subscriptions from store");
        }
        for subscription in surviving {
            router.register_subscription(subscription.query, subscription.handle, false).await;
        }

        info!(
            system_id = config.system_id,
            component_id = config.component_id,
            endpoints = config.connections.len(),
            dialect = dialect.name(),
            "router started"
        );
        tokio::spawn(router.run(events_rx));

        Ok(RouterHandle {
            events: events_tx,
            metrics,
            udp_addrs: Arc::new(udp_addrs),
        })
    }

    async fn run(mut self, mut events: mpsc::Receiver<RouterEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                RouterEvent::Inbound { key, bytes } => self.on_inbound(key, bytes).await,
                RouterEvent::Send { message, version, reply } => {
                    let _ = reply.send(self.on_send(message, version).await);
                }
                RouterEvent::Subscribe { query, handle, reply } => {
                    let _ = reply.send(self.on_subscribe(query, handle).await);
                }
                RouterEvent::Unsubscribe { subscriber }
                | RouterEvent::SubscriberClosed { subscriber } => {
                    self.on_subscriber_gone(subscriber).await;
                }
                RouterEvent::Shutdown => {
                    info!("router shutting down");
                    break;
                }
            }
        }
        // Dropping the state closes every driver outbox; drivers observe
        // closure on their next send or receive and exit their loops.
    }

    async fn on_inbound(&mut self, key: EndpointKey, bytes: Bytes) {
        if !self.endpoints.contains_key(&key) {
            // Only udpin peers come into existence on first receive.
            let EndpointKey::UdpPeer { link, peer } = key else {
                debug!(endpoint = %key, "bytes from unregistered endpoint dropped");
                return;
            };
            let Some(udp_link) = self.udp_in_links.get(&link) else {
                debug!(endpoint = %key, "bytes for unknown udp link dropped");
                return;
            };
            info!(endpoint = %key, "learned udp peer");
            self.endpoints.insert(
                key,
                EndpointRecord {
                    writer: EndpointWriter::Datagram { tx: udp_link.tx.clone(), peer },
                    rx_buf: None,
                },
            );
        }

        let Some(record) = self.endpoints.get_mut(&key) else {
            return;
        };
        let mut extracted = Vec::new();
        match &mut record.rx_buf {
            None => extracted.push(codec::parse_datagram(&bytes)),
            Some(buf) => {
                buf.extend_from_slice(&bytes);
                loop {
                    match codec::next_frame(buf) {
                        Ok(Some(frame)) => extracted.push(Ok(frame)),
                        Ok(None) => break,
                        Err(e) => extracted.push(Err(e)),
                    }
                }
            }
        }

        for result in extracted {
            match result {
                Ok(raw) => self.handle_frame(key, raw).await,
                Err(e) => {
                    self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(endpoint = %key, error = %e, "frame discarded");
                }
            }
        }
    }

    async fn handle_frame(&mut self, source: EndpointKey, raw: RawFrame) {
        self.metrics.frames_received.fetch_add(1, Ordering::Relaxed);
        match Frame::decode(&raw, self.dialect) {
            Ok(frame) => {
                self.routes
                    .learn(frame.raw.system_id, frame.raw.component_id, source);
                self.fan_out_local(&frame);
                self.forward(
                    frame.raw.wire_bytes().clone(),
                    Some(source),
                    frame.target_system,
                    frame.target_component,
                )
                .await;
            }
            Err(FrameError::UnknownMessage(id)) => {
                // No dialect entry means no CRC_EXTRA either; forward the
                // frame opaquely so unrecognized traffic keeps flowing
                // between peers.
                self.metrics.unknown_messages.fetch_add(1, Ordering::Relaxed);
                self.routes.learn(raw.system_id, raw.component_id, source);
                debug!(endpoint = %source, message_id = id, "unknown message forwarded as broadcast");
                self.forward(raw.wire_bytes().clone(), Some(source), 0, 0).await;
            }
            Err(e) => {
                if matches!(e, FrameError::ChecksumInvalid { .. }) {
                    self.metrics.checksum_errors.fetch_add(1, Ordering::Relaxed);
                }
                self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(endpoint = %source, error = %e, "frame dropped");
            }
        }
    }

    /// Forwarding policy. Broadcast goes to every endpoint except the
    /// source; targeted frames follow learned routes under 0-wildcard
    /// matching and are never sent to endpoints the target has not been
    /// seen on. `source` is `None` for locally originated frames.
    async fn forward(
        &mut self,
        wire: Bytes,
        source: Option<EndpointKey>,
        target_system: u8,
        target_component: u8,
    ) {
        let broadcast = target_system == 0 && target_component == 0;
        let selected: Vec<EndpointKey> = if broadcast {
            self.endpoints
                .keys()
                .filter(|&&k| Some(k) != source)
                .copied()
                .collect()
        } else {
            self.routes
                .select(target_system, target_component)
                .into_iter()
                .filter(|&k| Some(k) != source)
                .collect()
        };

        let mut dead = Vec::new();
        for key in selected {
            let Some(record) = self.endpoints.get(&key) else {
                continue;
            };
            match record.writer.forward(wire.clone()).await {
                ForwardOutcome::Sent => {
                    self.metrics.frames_forwarded.fetch_add(1, Ordering::Relaxed);
                    self.metrics
                        .bytes_forwarded
                        .fetch_add(wire.len() as u64, Ordering::Relaxed);
                }
                ForwardOutcome::Stalled => {
                    self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(endpoint = %key, "endpoint stalled; frame dropped");
                }
                ForwardOutcome::Closed => dead.push(key),
            }
        }
        for key in dead {
            warn!(endpoint = %key, "endpoint writer closed; endpoint removed");
            self.endpoints.remove(&key);
        }
    }

    fn fan_out_local(&self, frame: &Frame) {
        for subscription in self.subscriptions.iter() {
            if !subscription.query.matches(frame) {
                continue;
            }
            let delivery = if subscription.query.deliver_frame {
                Delivery::Frame(frame.clone())
            } else {
                Delivery::Message(ReceivedMessage {
                    message: frame.message.clone(),
                    system_id: frame.raw.system_id,
                    component_id: frame.raw.component_id,
                    sequence: frame.raw.sequence,
                })
            };
            if subscription.handle.try_deliver(delivery) {
                self.metrics.local_deliveries.fetch_add(1, Ordering::Relaxed);
            } else {
                // Dead or lagging subscriber; removal is reconciled by the
                // liveness watcher, not the delivery path.
                debug!(subscriber = ?subscription.handle.id(), "local delivery failed");
            }
        }
    }

    async fn on_send(
        &mut self,
        message: MavMessage,
        version: MavVersion,
    ) -> Result<(), RouterError> {
        let encoded = self
            .dialect
            .encode(&message, version)
            .map_err(|_| RouterError::InvalidMessage(message.id()))?;
        if encoded.message_id > version.max_message_id() {
            return Err(RouterError::ProtocolUndefined(encoded.message_id));
        }

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let raw = protocol::pack_frame(
            version,
            encoded.message_id,
            encoded.crc_extra,
            self.system_id,
            self.component_id,
            sequence,
            &encoded.payload,
        );
        let (target_system, target_component) = encoded.targeting.resolve(&message);
        let frame = Frame {
            raw,
            message,
            targeting: encoded.targeting,
            target_system,
            target_component,
        };

        self.fan_out_local(&frame);
        self.forward(
            frame.raw.wire_bytes().clone(),
            None,
            target_system,
            target_component,
        )
        .await;
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn on_subscribe(
        &mut self,
        query: Query,
        handle: SubscriberHandle,
    ) -> Result<(), RouterError> {
        if let Some(id) = query.message_id {
            if self.dialect.spec(id).is_none() {
                return Err(RouterError::InvalidMessage(id));
            }
        }
        self.register_subscription(query, handle, true).await;
        Ok(())
    }

    async fn register_subscription(
        &mut self,
        query: Query,
        handle: SubscriberHandle,
        persist: bool,
    ) {
        let first_for_subscriber = !self.subscriptions.contains_subscriber(handle.id());
        if !self.subscriptions.insert(query.clone(), handle.clone()) {
            return; // duplicate (query, subscriber) pair
        }
        if persist {
            self.store.insert(query, handle.clone()).await;
        }
        debug!(
            subscriber = ?handle.id(),
            total = self.subscriptions.len(),
            "subscription added"
        );
        if first_for_subscriber {
            // Liveness: post a death event once the subscriber drops its
            // receiver. One watcher per subscriber covers all its queries.
            let events = self.events.clone();
            let subscriber = handle.id();
            tokio::spawn(async move {
                handle.closed().await;
                let _ = events
                    .send(RouterEvent::SubscriberClosed { subscriber })
                    .await;
            });
        }
    }

    async fn on_subscriber_gone(&mut self, subscriber: SubscriberId) {
        let removed = self.subscriptions.remove_subscriber(subscriber);
        if removed > 0 {
            debug!(?subscriber, removed, "subscriber removed");
            self.store.remove_subscriber(subscriber).await;
        }
    }
}
