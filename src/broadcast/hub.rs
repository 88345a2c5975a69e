//! Fan-out hub: one producer, arbitrarily many live subscribers.
//!
//! Built on `tokio::sync::broadcast`, which gives each subscriber an
//! independent cursor into a shared ring buffer. Publishing is O(1) in the
//! subscriber count and never blocks; a slow subscriber only ever loses its
//! *own* oldest buffered messages (the documented backpressure policy is
//! drop-oldest per subscriber, surfaced through the lag counter). Delivery
//! order to each subscriber is the publish order; no ordering is guaranteed
//! across subscribers.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::time::timeout;

use crate::config::HubConfig;
use crate::event::BroadcastMessage;

/// Errors surfaced by the hub at the subscription boundary.
#[derive(Debug, Error)]
pub enum HubError {
    /// The subscriber table is full. Reported upward as a backpressure
    /// signal instead of crashing the process.
    #[error("subscriber capacity reached ({limit})")]
    AtCapacity { limit: usize },
}

/// Opaque registration token handed out per subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u64);

/// Shared fan-out point between the ingestion path and every outbound
/// connection. Construct once, pass around as `Arc<BroadcastHub>` — there is
/// deliberately no global instance.
#[derive(Debug)]
pub struct BroadcastHub {
    sender: Sender<BroadcastMessage>,
    registry: Mutex<FxHashSet<u64>>,
    next_token: AtomicU64,
    dropped: AtomicUsize,
    buffer_capacity: usize,
    max_subscribers: usize,
}

impl BroadcastHub {
    pub fn new(config: &HubConfig) -> Arc<Self> {
        let buffer_capacity = config.buffer_capacity.max(1);
        let (sender, _) = broadcast::channel(buffer_capacity);
        Arc::new(Self {
            sender,
            registry: Mutex::new(FxHashSet::default()),
            next_token: AtomicU64::new(0),
            dropped: AtomicUsize::new(0),
            buffer_capacity,
            max_subscribers: config.max_subscribers,
        })
    }

    /// Deliver a message to every currently registered subscriber.
    ///
    /// Returns how many subscribers the message reached. Publishing with no
    /// subscribers is not an error: the feed is live-only, so the message is
    /// simply gone.
    pub fn publish(&self, message: BroadcastMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Register a new subscriber.
    ///
    /// A subscriber only ever sees messages published after this call; there
    /// is no replay. Fails with [`HubError::AtCapacity`] once the subscriber
    /// table is full.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscription, HubError> {
        let token = {
            let mut registry = self.registry.lock().expect("hub registry poisoned");
            if registry.len() >= self.max_subscribers {
                return Err(HubError::AtCapacity {
                    limit: self.max_subscribers,
                });
            }
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            registry.insert(token);
            token
        };

        Ok(Subscription {
            token: SubscriberToken(token),
            receiver: self.sender.subscribe(),
            hub: Arc::clone(self),
        })
    }

    /// Remove a token from the registry. Idempotent: detaching an unknown or
    /// already-removed token is a no-op, so duplicate cleanup paths on a
    /// closing connection are harmless.
    pub fn detach(&self, token: SubscriberToken) {
        self.registry
            .lock()
            .expect("hub registry poisoned")
            .remove(&token.0);
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().expect("hub registry poisoned").len()
    }

    /// Total messages lost to lagging subscribers since startup.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer depth.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

/// One live subscription: a registration token plus a buffered receiver.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// deregisters it exactly once; the connection handler just needs to let the
/// handle fall out of scope on any exit path.
#[derive(Debug)]
pub struct Subscription {
    token: SubscriberToken,
    receiver: Receiver<BroadcastMessage>,
    hub: Arc<BroadcastHub>,
}

impl Subscription {
    pub fn token(&self) -> SubscriberToken {
        self.token
    }

    /// Receive the next message, awaiting if necessary.
    ///
    /// A `Lagged` error means this subscriber fell behind and its oldest
    /// buffered messages were discarded; the miss is added to the hub's
    /// drop counter and the subscriber can keep receiving from the newest
    /// retained message.
    pub async fn recv(&mut self) -> Result<BroadcastMessage, broadcast::error::RecvError> {
        match self.receiver.recv().await {
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                self.hub
                    .dropped
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::RecvError::Lagged(missed))
            }
            other => other,
        }
    }

    /// Non-blocking receive, with the same lag accounting as `recv`.
    pub fn try_recv(&mut self) -> Result<BroadcastMessage, broadcast::error::TryRecvError> {
        match self.receiver.try_recv() {
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                self.hub
                    .dropped
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::TryRecvError::Lagged(missed))
            }
            other => other,
        }
    }

    /// Wait up to `duration` for the next message, skipping lag gaps.
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<BroadcastMessage> {
        loop {
            match timeout(duration, self.recv()).await {
                Ok(Ok(message)) => return Some(message),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Convert into an async stream of messages, skipping lag gaps and
    /// ending when the hub is dropped. Deregistration still happens when the
    /// stream is dropped.
    pub fn into_async_stream(self) -> impl futures_util::stream::Stream<Item = BroadcastMessage> {
        stream::unfold(self, |mut subscription| async move {
            loop {
                match subscription.recv().await {
                    Ok(message) => return Some((message, subscription)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Explicitly end this subscription. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.detach(self.token);
    }
}
