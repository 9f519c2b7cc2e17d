//! Registry mapping subscriber names to delivery callbacks.

use crate::error::Result;
use crate::types::{RouteEvent, SubscriberId};
use crossbeam_channel::{bounded, Receiver, TrySendError};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::{DeliveryReport, Registration, RouteEventSink, Subscription};

type Registrations = HashMap<SubscriberId, Registration>;

/// Shared registry of route-event subscribers.
pub struct SubscriptionRegistry {
    /// Current view. Replaced on write, never mutated while shared.
    entries: RwLock<Arc<Registrations>>,
    /// Counter for generating registration tokens.
    next_token: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(HashMap::new())),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register `callback` under `subscriber`, replacing any previous callback
    /// with that name.
    ///
    /// Only events produced after this call are delivered.
    pub fn subscribe<F>(self: &Arc<Self>, subscriber: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&RouteEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId::new(subscriber)?;
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(self.insert(id, token, Arc::new(callback)))
    }

    /// Register a bounded queue instead of a callback.
    ///
    /// The watch loop never blocks on the queue: when it is full the event is
    /// dropped for this subscriber only. Dropping the receiver removes the
    /// registration on the next delivery attempt.
    pub fn subscribe_channel(
        self: &Arc<Self>,
        subscriber: &str,
        buffer_size: usize,
    ) -> Result<(Subscription, Receiver<RouteEvent>)> {
        let id = SubscriberId::new(subscriber)?;
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = bounded(buffer_size.max(1));

        let registry = Arc::downgrade(self);
        let name = id.clone();
        let sink: RouteEventSink =
            Arc::new(move |event: &RouteEvent| match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber = %name,
                        route = %event,
                        "Subscriber queue full, dropping route event"
                    );
                }
                Err(TrySendError::Disconnected(_)) => {
                    if let Some(registry) = registry.upgrade() {
                        registry.remove_registration(&name, token);
                    }
                }
            });

        Ok((self.insert(id, token, sink), receiver))
    }

    /// Remove `subscriber` whatever registration it has. Returns whether one
    /// was present.
    pub fn unsubscribe(&self, subscriber: &str) -> bool {
        let mut entries = self.entries.write();
        if !entries.contains_key(subscriber) {
            return false;
        }
        Arc::make_mut(&mut entries).remove(subscriber);
        info!(subscriber, "Subscriber unregistered from route events");
        true
    }

    /// Get subscriber count.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, subscriber: &str) -> bool {
        self.entries.read().contains_key(subscriber)
    }

    /// Names of all current subscribers, sorted.
    pub fn subscribers(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<_> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // --- Fan-out ---

    /// Call every currently registered callback with `event`, one at a time.
    ///
    /// Iterates a snapshot taken on entry. A panicking callback is logged and
    /// counted; the remaining callbacks still run.
    pub fn deliver(&self, event: &RouteEvent) -> DeliveryReport {
        let snapshot = Arc::clone(&*self.entries.read());
        let mut report = DeliveryReport::default();

        for (id, registration) in snapshot.iter() {
            let sink = &registration.sink;
            match panic::catch_unwind(AssertUnwindSafe(|| sink(event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.panicked += 1;
                    error!(
                        subscriber = %id,
                        route = %event,
                        panic = panic_message(payload.as_ref()),
                        "Subscriber panicked while handling route event"
                    );
                }
            }
        }

        report
    }

    // --- Internal ---

    fn insert(
        self: &Arc<Self>,
        id: SubscriberId,
        token: u64,
        sink: RouteEventSink,
    ) -> Subscription {
        let replaced = {
            let mut entries = self.entries.write();
            Arc::make_mut(&mut entries)
                .insert(id.clone(), Registration { token, sink })
                .is_some()
        };

        info!(subscriber = %id, replaced, "Subscriber registered for route events");
        Subscription::new(id, token, Arc::downgrade(self))
    }

    /// Remove `id` only if its live registration carries `token`.
    pub(crate) fn remove_registration(&self, id: &SubscriberId, token: u64) -> bool {
        let mut entries = self.entries.write();
        if !matches!(entries.get(id), Some(r) if r.token == token) {
            return false;
        }
        Arc::make_mut(&mut entries).remove(id);
        info!(subscriber = %id, "Subscriber unregistered from route events");
        true
    }

    pub(crate) fn is_current(&self, id: &SubscriberId, token: u64) -> bool {
        matches!(self.entries.read().get(id), Some(r) if r.token == token)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
