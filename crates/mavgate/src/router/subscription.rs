// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local subscribers: queries, the router's working registry, and the
//! store that lets subscriptions survive a router restart.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};

use crate::dialect::MavMessage;
use crate::protocol::Frame;

/// What a matching subscriber receives.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The decoded message plus its source header fields.
    Message(ReceivedMessage),
    /// The whole validated frame, raw wire bytes included.
    Frame(Frame),
}

#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message: MavMessage,
    pub system_id: u8,
    pub component_id: u8,
    pub sequence: u8,
}

/// Subscription predicate.
///
/// Zero-valued id fields are wildcards, `message_id: None` matches any
/// known message. Target-id predicates never match broadcast frames: a
/// frame addressed to `(0, 0)` is for everyone, not for the subscriber
/// watching a specific target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub message_id: Option<u32>,
    pub source_system: u8,
    pub source_component: u8,
    pub target_system: u8,
    pub target_component: u8,
    /// Deliver the full frame instead of the decoded message.
    pub deliver_frame: bool,
}

impl Query {
    pub fn matches(&self, frame: &Frame) -> bool {
        if let Some(id) = self.message_id {
            if frame.raw.message_id != id {
                return false;
            }
        }
        if self.source_system != 0 && self.source_system != frame.raw.system_id {
            return false;
        }
        if self.source_component != 0 && self.source_component != frame.raw.component_id {
            return false;
        }
        let broadcast = frame.target_system == 0 && frame.target_component == 0;
        if self.target_system != 0 && (broadcast || self.target_system != frame.target_system) {
            return false;
        }
        if self.target_component != 0
            && (broadcast || self.target_component != frame.target_component)
        {
            return false;
        }
        true
    }
}

/// Unique id of a subscriber handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Delivery channel of one subscriber. Cloning the handle does not create
/// a new subscriber; identity is the id.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    tx: mpsc::Sender<Delivery>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Non-blocking delivery; a full or closed channel loses this delivery
    /// and is reconciled by the liveness watcher, not here.
    pub(crate) fn try_deliver(&self, delivery: Delivery) -> bool {
        self.tx.try_send(delivery).is_ok()
    }

    /// Resolves once the subscriber has dropped its receiver.
    pub(crate) async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// Create a subscriber delivery channel of the given depth.
pub fn subscriber_channel(capacity: usize) -> (SubscriberHandle, mpsc::Receiver<Delivery>) {
    let (tx, rx) = mpsc::channel(capacity);
    let id = SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed));
    (SubscriberHandle { id, tx }, rx)
}

/// One registered subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub query: Query,
    pub handle: SubscriberHandle,
}

/// The router's working set of subscriptions.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    entries: Vec<Subscription>,
}

impl SubscriptionRegistry {
    /// Insert unless an identical `(query, subscriber)` pair is already
    /// registered. Returns `false` on duplicates.
    pub fn insert(&mut self, query: Query, handle: SubscriberHandle) -> bool {
        if self
            .entries
            .iter()
            .any(|s| s.handle.id() == handle.id() && s.query == query)
        {
            return false;
        }
        self.entries.push(Subscription { query, handle });
        true
    }

    /// Remove every subscription held by `subscriber`; returns how many.
    pub fn remove_subscriber(&mut self, subscriber: SubscriberId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|s| s.handle.id() != subscriber);
        before - self.entries.len()
    }

    pub fn contains_subscriber(&self, subscriber: SubscriberId) -> bool {
        self.entries.iter().any(|s| s.handle.id() == subscriber)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

enum StoreCommand {
    Insert(Query, SubscriberHandle),
    RemoveSubscriber(SubscriberId),
    Load(oneshot::Sender<Vec<Subscription>>),
}

/// Handle to the subscription store task.
///
/// The store's lifetime is independent of any router: a restarted router
/// loads the surviving subscriptions from it before processing its first
/// event, so subscribers see no lost registrations beyond the restart gap.
#[derive(Clone)]
pub struct SubscriptionStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl SubscriptionStore {
    /// Spawn the store task.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut entries: Vec<Subscription> = Vec::new();
            while let Some(command) = rx.recv().await {
                match command {
                    StoreCommand::Insert(query, handle) => {
                        if !entries
                            .iter()
                            .any(|s| s.handle.id() == handle.id() && s.query == query)
                        {
                            entries.push(Subscription { query, handle });
                        }
                    }
                    StoreCommand::RemoveSubscriber(id) => {
                        entries.retain(|s| s.handle.id() != id);
                    }
                    StoreCommand::Load(reply) => {
                        let _ = reply.send(entries.clone());
                    }
                }
            }
        });
        Self { tx }
    }

    pub(crate) async fn insert(&self, query: Query, handle: SubscriberHandle) {
        let _ = self.tx.send(StoreCommand::Insert(query, handle)).await;
    }

    pub(crate) async fn remove_subscriber(&self, subscriber: SubscriberId) {
        let _ = self
            .tx
            .send(StoreCommand::RemoveSubscriber(subscriber))
            .await;
    }

    /// All stored subscriptions; empty when the store task is gone.
    pub(crate) async fn load(&self) -> Vec<Subscription> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(StoreCommand::Load(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{self, common, MavMessage};
    use crate::protocol::{pack_frame, Frame, MavVersion};

    fn decoded(message: &MavMessage, system_id: u8, component_id: u8) -> Frame {
        let dialect = dialect::by_name("common").unwrap();
        let encoded = dialect.encode(message, MavVersion::V2).unwrap();
        let raw = pack_frame(
            MavVersion::V2,
            encoded.message_id,
            encoded.crc_extra,
            system_id,
            component_id,
            0,
            &encoded.payload,
        );
        Frame::decode(&raw, dialect).unwrap()
    }

    fn heartbeat_from(system_id: u8, component_id: u8) -> Frame {
        decoded(
            &MavMessage::Heartbeat(common::Heartbeat::default()),
            system_id,
            component_id,
        )
    }

    fn ping_to(target_system: u8, target_component: u8) -> Frame {
        decoded(
            &MavMessage::Ping(common::Ping {
                time_usec: 1,
                seq: 1,
                target_system,
                target_component,
            }),
            42,
            1,
        )
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = Query::default();
        assert!(query.matches(&heartbeat_from(1, 1)));
        assert!(query.matches(&ping_to(5, 5)));
    }

    #[test]
    fn message_id_predicate() {
        let query = Query { message_id: Some(0), ..Default::default() };
        assert!(query.matches(&heartbeat_from(1, 1)));
        assert!(!query.matches(&ping_to(5, 5)));
    }

    #[test]
    fn source_predicates_with_wildcards() {
        let query = Query { source_system: 7, ..Default::default() };
        assert!(query.matches(&heartbeat_from(7, 3)));
        assert!(!query.matches(&heartbeat_from(8, 3)));

        let query = Query { source_system: 7, source_component: 1, ..Default::default() };
        assert!(query.matches(&heartbeat_from(7, 1)));
        assert!(!query.matches(&heartbeat_from(7, 2)));
    }

    #[test]
    fn target_predicates_do_not_match_broadcast() {
        let query = Query { target_system: 5, ..Default::default() };
        assert!(!query.matches(&heartbeat_from(5, 1)));
        assert!(!query.matches(&ping_to(0, 0)));
        assert!(query.matches(&ping_to(5, 9)));
        assert!(!query.matches(&ping_to(6, 9)));
    }

    #[test]
    fn matches_targeted_component() {
        // The component predicate compares against target_component, not
        // target_system.
        let query = Query { target_component: 9, ..Default::default() };
        assert!(query.matches(&ping_to(5, 9)));
        assert!(!query.matches(&ping_to(9, 5)));
    }

    #[test]
    fn registry_deduplicates_query_handle_pairs() {
        let (handle, _rx) = subscriber_channel(4);
        let mut registry = SubscriptionRegistry::default();
        let query = Query { message_id: Some(0), ..Default::default() };

        assert!(registry.insert(query.clone(), handle.clone()));
        assert!(!registry.insert(query.clone(), handle.clone()));
        assert!(registry.insert(Query::default(), handle.clone()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_subscriber_drops_all_entries() {
        let (a, _rx_a) = subscriber_channel(4);
        let (b, _rx_b) = subscriber_channel(4);
        let mut registry = SubscriptionRegistry::default();
        registry.insert(Query::default(), a.clone());
        registry.insert(Query { message_id: Some(0), ..Default::default() }, a.clone());
        registry.insert(Query::default(), b.clone());

        assert_eq!(registry.remove_subscriber(a.id()), 2);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains_subscriber(a.id()));
        assert!(registry.contains_subscriber(b.id()));
    }

    #[tokio::test]
    async fn store_round_trip() {
        let store = SubscriptionStore::spawn();
        let (handle, _rx) = subscriber_channel(4);
        let query = Query { message_id: Some(4), ..Default::default() };

        store.insert(query.clone(), handle.clone()).await;
        store.insert(query.clone(), handle.clone()).await; // duplicate
        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].query, query);
        assert_eq!(loaded[0].handle.id(), handle.id());

        store.remove_subscriber(handle.id()).await;
        assert!(store.load().await.is_empty());
    }
}
