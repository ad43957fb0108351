//! Fan-out broker: topic-based publish/subscribe over long-lived
//! connections
//!
//! The broker owns the one piece of mutable shared state in the pipeline:
//! the topic-membership table. It is sharded (`DashMap`) so concurrent
//! subscribe/unsubscribe/publish on unrelated topics never contend on a
//! single lock. A reverse index per connection makes disconnect cleanup
//! O(topics joined), not O(all topics).
//!
//! Delivery is best-effort and fire-and-forget: `publish` enqueues a frame
//! on every subscriber's bounded queue and returns. There is no
//! acknowledgment, no retry, and no catch-up for connections that
//! subscribe later.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::queue::{DropPolicy, OutboundMessage, OutboundQueue, OverflowAction};
use crate::topic::Topic;

/// Unique connection identifier, assigned at registration.
pub type ConnId = u64;

/// Configuration for the fan-out broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Maximum queued frames per connection.
    pub queue_capacity: usize,
    /// Policy applied when a connection's queue overflows.
    pub drop_policy: DropPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

/// Handle owned by a connection's writer task.
///
/// The writer calls [`ConnectionHandle::next_batch`] in a loop; it resolves
/// with queued frames as they arrive and with `None` once the connection
/// has been torn down and the queue fully drained.
pub struct ConnectionHandle {
    id: ConnId,
    queue: Mutex<OutboundQueue>,
    notify: Notify,
    closed: AtomicBool,
}

impl ConnectionHandle {
    fn new(id: ConnId, capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            id,
            queue: Mutex::new(OutboundQueue::new(capacity, drop_policy)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of frames currently queued (test and metrics hook).
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Wait for the next batch of outbound frames.
    ///
    /// Returns `None` after the connection is closed and the queue is
    /// empty; no frame is ever handed out after that.
    pub async fn next_batch(&self) -> Option<Vec<OutboundMessage>> {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if !queue.is_empty() {
                    return Some(queue.drain());
                }
            }
            if self.is_closed() {
                return None;
            }
            // notify_one stores a permit, so an enqueue racing this await
            // is not lost.
            self.notify.notified().await;
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Outcome of a single publish call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Frames dropped from lagging drop-oldest queues.
    pub dropped: usize,
    /// Connections torn down by the disconnect overflow policy.
    pub disconnected: Vec<ConnId>,
}

/// Topic broker for many producers and many consumers.
pub struct FanoutBroker {
    config: BrokerConfig,
    next_id: AtomicU64,
    connections: DashMap<ConnId, Arc<ConnectionHandle>>,
    /// topic -> member connections
    topics: DashMap<Topic, BTreeSet<ConnId>>,
    /// connection -> joined topics (reverse index for O(topics) teardown)
    memberships: DashMap<ConnId, BTreeSet<Topic>>,
}

impl FanoutBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            connections: DashMap::new(),
            topics: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BrokerConfig::default())
    }

    /// Register a new connection and return its handle.
    pub fn register(&self) -> Arc<ConnectionHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ConnectionHandle::new(
            id,
            self.config.queue_capacity,
            self.config.drop_policy,
        ));
        self.connections.insert(id, handle.clone());
        self.memberships.insert(id, BTreeSet::new());
        debug!(conn_id = id, "connection registered");
        handle
    }

    /// Add a connection to a topic's member set.
    ///
    /// Returns false when the connection is unknown (already torn down).
    pub fn subscribe(&self, conn_id: ConnId, topic: Topic) -> bool {
        let Some(mut joined) = self.memberships.get_mut(&conn_id) else {
            return false;
        };
        joined.insert(topic.clone());
        self.topics.entry(topic.clone()).or_default().insert(conn_id);
        debug!(conn_id, topic = %topic, "subscribed");
        true
    }

    /// Remove a connection from one topic.
    pub fn unsubscribe(&self, conn_id: ConnId, topic: &Topic) {
        if let Some(mut joined) = self.memberships.get_mut(&conn_id) {
            joined.remove(topic);
        }
        if let Some(mut members) = self.topics.get_mut(topic) {
            members.remove(&conn_id);
        }
        debug!(conn_id, topic = %topic, "unsubscribed");
    }

    /// Tear down a connection: remove every topic membership, then close
    /// the handle so its writer task terminates. After this returns, no
    /// further frame is queued for the connection.
    pub fn disconnect(&self, conn_id: ConnId) {
        if let Some((_, joined)) = self.memberships.remove(&conn_id) {
            for topic in &joined {
                if let Some(mut members) = self.topics.get_mut(topic) {
                    members.remove(&conn_id);
                }
            }
        }
        if let Some((_, handle)) = self.connections.remove(&conn_id) {
            handle.close();
            debug!(conn_id, "connection disconnected");
        }
    }

    /// Deliver a frame to every current member of `topic`.
    ///
    /// Never fails: a delivery fault affects only the one subscriber it
    /// belongs to. Ordering across topics is not guaranteed.
    pub async fn publish(&self, topic: &Topic, payload: Arc<str>) -> PublishOutcome {
        let member_ids: Vec<ConnId> = match self.topics.get(topic) {
            Some(members) => members.iter().copied().collect(),
            None => Vec::new(),
        };

        let mut outcome = PublishOutcome::default();

        for conn_id in member_ids {
            let Some(handle) = self.connections.get(&conn_id).map(|h| h.clone()) else {
                continue;
            };

            let action = {
                let mut queue = handle.queue.lock().await;
                let before = queue.messages_dropped();
                let result = queue.enqueue(OutboundMessage::new(payload.clone()));
                outcome.dropped += (queue.messages_dropped() - before) as usize;
                result
            };

            match action {
                Ok(()) => {
                    handle.notify.notify_one();
                    outcome.delivered += 1;
                }
                Err(OverflowAction::DisconnectConnection) => {
                    warn!(conn_id, topic = %topic, "queue overflow, disconnecting lagging subscriber");
                    self.disconnect(conn_id);
                    outcome.disconnected.push(conn_id);
                }
            }
        }

        debug!(
            topic = %topic,
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            "published"
        );
        outcome
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of members currently in a topic.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map(|m| m.len()).unwrap_or(0)
    }

    /// Topics a connection has joined (test and diagnostics hook).
    pub fn topics_of(&self, conn_id: ConnId) -> Vec<Topic> {
        self.memberships
            .get(&conn_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }
}
