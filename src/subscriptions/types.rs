//! Subscription types.

use super::registry::SubscriptionRegistry;
use crate::error::Result;
use crate::types::{RouteEvent, SubscriberId};
use std::fmt;
use std::sync::{Arc, Weak};

/// Delivery callback. Runs synchronously on the watch thread.
pub type RouteEventSink = Arc<dyn Fn(&RouteEvent) + Send + Sync>;

/// A live registration in the registry.
#[derive(Clone)]
pub(crate) struct Registration {
    /// Distinguishes this registration from later ones under the same name.
    pub(crate) token: u64,
    pub(crate) sink: RouteEventSink,
}

/// Outcome of delivering one route event to a registry snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub panicked: usize,
}

/// Handle returned to a subscriber.
///
/// Dropping the handle leaves the subscriber registered; call
/// [`close`](Self::close) to stop receiving events.
pub struct Subscription {
    subscriber: SubscriberId,
    token: u64,
    registry: Weak<SubscriptionRegistry>,
}

impl Subscription {
    pub(crate) fn new(
        subscriber: SubscriberId,
        token: u64,
        registry: Weak<SubscriptionRegistry>,
    ) -> Self {
        Self {
            subscriber,
            token,
            registry,
        }
    }

    pub fn subscriber(&self) -> &SubscriberId {
        &self.subscriber
    }

    /// Whether this handle's registration is still the live one.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.is_current(&self.subscriber, self.token))
            .unwrap_or(false)
    }

    /// End the subscription. Never fails; closing twice is a no-op.
    ///
    /// If the same name has since been re-registered, the newer registration
    /// is left alone.
    pub fn close(&self) -> Result<()> {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_registration(&self.subscriber, self.token);
        }
        Ok(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber)
            .field("token", &self.token)
            .finish()
    }
}
