//! Bounded per-connection outbound queues
//!
//! Every subscriber connection owns one bounded queue of serialized push
//! frames. Without the bound, a slow consumer would accumulate an
//! unbounded backlog; the overflow policy decides what happens instead.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Policy applied when a connection's outbound queue overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropPolicy {
    /// Disconnect the lagging subscriber immediately.
    Disconnect,
    /// Drop the oldest queued frame to make room for the newest one.
    DropOldest,
}

impl FromStr for DropPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnect" => Ok(DropPolicy::Disconnect),
            "drop-oldest" => Ok(DropPolicy::DropOldest),
            other => Err(format!("unknown drop policy: {other}")),
        }
    }
}

/// A queued outbound push frame.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Serialized push frame, shared between all subscriber queues.
    pub payload: Arc<str>,
    /// When the frame was queued for this connection.
    pub queued_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(payload: Arc<str>) -> Self {
        Self {
            payload,
            queued_at: Utc::now(),
        }
    }
}

/// Action the broker must take after an enqueue hit the capacity bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowAction {
    /// Connection should be torn down.
    DisconnectConnection,
}

/// Bounded FIFO of frames awaiting delivery to one connection.
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<OutboundMessage>,
    capacity: usize,
    drop_policy: DropPolicy,
    messages_dropped: u64,
    is_lagging: bool,
}

impl OutboundQueue {
    pub fn new(capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            drop_policy,
            messages_dropped: 0,
            is_lagging: false,
        }
    }

    /// Enqueue a frame. Returns Err when the connection must be closed.
    pub fn enqueue(&mut self, message: OutboundMessage) -> Result<(), OverflowAction> {
        if self.messages.len() >= self.capacity {
            self.is_lagging = true;

            match self.drop_policy {
                DropPolicy::Disconnect => {
                    return Err(OverflowAction::DisconnectConnection);
                }
                DropPolicy::DropOldest => {
                    self.messages.pop_front();
                    self.messages_dropped += 1;
                }
            }
        }

        self.messages.push_back(message);

        if self.messages.len() < self.capacity / 2 {
            self.is_lagging = false;
        }

        Ok(())
    }

    /// Drain all queued frames for sending, oldest first.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.is_lagging = false;
        self.messages.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_lagging(&self) -> bool {
        self.is_lagging
    }

    /// Total frames dropped for this connection since it registered.
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped
    }
}
