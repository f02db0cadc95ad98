// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # mavgate - MAVLink message router
//!
//! Multiplexes MAVLink v1/v2 traffic across heterogeneous transports
//! (serial, TCP-out, UDP-in, UDP-out) and between the network and
//! in-process subscribers exchanging strongly typed messages.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mavgate::{Query, Router, RouterConfig, SubscriptionStore, subscriber_channel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mavgate::RouterError> {
//!     let config = RouterConfig {
//!         dialect: Some("common".into()),
//!         connections: vec!["udpin:0.0.0.0:14550".parse()?],
//!         ..Default::default()
//!     };
//!
//!     let store = SubscriptionStore::spawn();
//!     let router = Router::spawn(config, store).await?;
//!
//!     let (handle, mut deliveries) = subscriber_channel(64);
//!     router
//!         .subscribe(Query { message_id: Some(0), ..Default::default() }, handle)
//!         .await?;
//!     while let Some(delivery) = deliveries.recv().await {
//!         println!("{delivery:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                       Router task                            |
//! |  endpoint map | route table | subscriptions | sequence no.   |
//! +--------------------------------------------------------------+
//!       ^ events (bounded mpsc)            | per-link outboxes
//! +--------------+--------------+--------------+--------------+
//! |   udpin      |   udpout     |   tcpout     |   serial     |
//! |  driver task |  driver task |  driver task |  driver task |
//! +--------------+--------------+--------------+--------------+
//! ```
//!
//! Drivers own their sockets and deliver raw byte chunks tagged with an
//! endpoint key; all framing, validation, routing, and fan-out happen in
//! the router task, which owns every piece of mutable state.

pub mod config;
pub mod dialect;
pub mod endpoint;
pub mod protocol;
pub mod router;

pub use config::{ConfigError, ConnectionSpec, RouterConfig};
pub use dialect::{Dialect, MavMessage, TargetingKind};
pub use protocol::{FrameError, MavVersion};
pub use router::{
    subscriber_channel, Delivery, Query, ReceivedMessage, Router, RouterError, RouterHandle,
    RouterMetrics, SubscriberHandle, SubscriberId, SubscriptionStore,
};
