//! Domain event bus
//!
//! Fans `DomainEvent`s out to every list that subscribed for them:
//! - Each subscriber declares a delivery queue and the event kinds it wants
//! - Each subscriber gets its own FIFO channel, so it sees events in publish order
//! - Publishing iterates a snapshot of the registry; subscribe/unsubscribe never
//!   block on an in-progress publish
//!
//! The bus is an explicit value handed to every list, not a global.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use folio_api::{DeliveryQueue, DomainEvent, EventKind};

/// Identifies one registration with the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscriber {
    handle: SubscriptionHandle,
    queue: DeliveryQueue,
    kinds: HashSet<EventKind>,
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl Subscriber {
    fn wants(&self, event: &DomainEvent, queue: DeliveryQueue) -> bool {
        self.queue == queue && self.kinds.contains(&event.kind())
    }
}

/// Receiving end of a subscription
///
/// Yields `None` once the subscription is removed from the bus.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<DomainEvent> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Publish/subscribe channel for domain events
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Arc<Subscriber>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for `kinds` delivered on `queue`
    pub fn subscribe(
        &self,
        queue: DeliveryQueue,
        kinds: impl IntoIterator<Item = EventKind>,
    ) -> (SubscriptionHandle, EventReceiver) {
        let (sender, rx) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle(Uuid::new_v4());
        let subscriber = Subscriber {
            handle,
            queue,
            kinds: kinds.into_iter().collect(),
            sender,
        };

        tracing::debug!(
            "[EventBus] Subscribed {} on {:?} for {:?}",
            handle,
            queue,
            subscriber.kinds
        );
        self.write_registry().push(Arc::new(subscriber));

        (handle, EventReceiver { rx })
    }

    /// Register for every event kind delivered on `queue`
    pub fn subscribe_all(&self, queue: DeliveryQueue) -> (SubscriptionHandle, EventReceiver) {
        self.subscribe(queue, EventKind::ALL)
    }

    /// Remove a registration. Returns false if it was already gone.
    ///
    /// Dropping the sender closes the subscriber's receiver.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.write_registry();
        let before = registry.len();
        registry.retain(|s| s.handle != handle);
        let removed = registry.len() != before;
        if removed {
            tracing::debug!("[EventBus] Unsubscribed {}", handle);
        }
        removed
    }

    /// Deliver `event` to every matching subscriber
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, event: DomainEvent, queue: DeliveryQueue) -> usize {
        let snapshot: Vec<Arc<Subscriber>> = self.read_registry().clone();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for subscriber in snapshot.iter().filter(|s| s.wants(&event, queue)) {
            match subscriber.sender.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(subscriber.handle),
            }
        }

        tracing::debug!(
            "[EventBus] Published {:?} on {:?} to {} subscriber(s)",
            event,
            queue,
            delivered
        );

        if !closed.is_empty() {
            // Receiver dropped without unsubscribing
            self.write_registry().retain(|s| !closed.contains(&s.handle));
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.read_registry().len()
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Vec<Arc<Subscriber>>> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Vec<Arc<Subscriber>>> {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
