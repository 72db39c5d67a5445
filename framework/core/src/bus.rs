use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Handler<T> = dyn Fn(&T) + Send + Sync;

struct Registered<T> {
    id: u64,
    handler: Arc<Handler<T>>,
}

struct Registry<T> {
    topics: HashMap<String, Vec<Registered<T>>>,
    next_id: u64,
}

/// An in-process publish/subscribe bus connecting the playback engine to the view surfaces.
///
/// There is no buffering and no replay: a subscriber that joins after a publish sees nothing
/// until the next publish. Subscribers are expected to render sensible defaults until their
/// first message arrives.
///
/// The bus is an explicit instance owned by the application and passed by reference to
/// everything that needs it, rather than ambient global state.
pub struct EventBus<T> {
    registry: Mutex<Registry<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                topics: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Deliver `payload` synchronously to every subscriber of `topic`, in subscription order.
    ///
    /// The handler list is snapshotted before fan-out, so a handler that unsubscribes itself
    /// or another subscriber during the publish cannot cause a handler to be skipped or the
    /// iteration to break.
    pub fn publish(&self, topic: &str, payload: &T) {
        let handlers: Vec<Arc<Handler<T>>> = {
            let registry = self.registry.lock();
            match registry.topics.get(topic) {
                Some(registered) => registered.iter().map(|r| r.handler.clone()).collect(),
                None => {
                    log::trace!("No subscribers for topic [{topic}]");
                    return;
                }
            }
        };

        for handler in handlers {
            handler(payload);
        }
    }

    /// Register `handler` for `topic`. Dropping the returned [Subscription] deregisters it.
    pub fn subscribe(
        self: &Arc<Self>,
        topic: &str,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Registered {
                id,
                handler: Arc::new(handler),
            });

        Subscription {
            bus: Arc::downgrade(self),
            topic: topic.to_string(),
            id,
        }
    }

    fn unsubscribe(&self, topic: &str, id: u64) {
        let mut registry = self.registry.lock();
        if let Some(registered) = registry.topics.get_mut(topic) {
            registered.retain(|r| r.id != id);
        }
    }
}

/// The capability to deregister a handler from an [EventBus].
///
/// The handler stays registered for exactly as long as this value is alive.
pub struct Subscription<T> {
    bus: Weak<EventBus<T>>,
    topic: String,
    id: u64,
}

impl<T> Subscription<T> {
    /// Deregister the handler now. Equivalent to dropping the subscription.
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(&self.topic, self.id);
        }
    }
}
