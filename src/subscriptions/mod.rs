//! Subscriber registry for route-change fan-out.
//!
//! Subscribers register a callback under a name of their choosing and receive
//! every [`RouteEvent`](crate::RouteEvent) produced after registration:
//! - Registering an existing name replaces its callback
//! - Delivery is never retroactive
//! - A panicking callback is isolated from other subscribers
//!
//! The registry is read by the watch loop and mutated by callers on any
//! thread. Writers swap in a new map; fan-out iterates an immutable snapshot
//! without holding a lock, so callbacks may subscribe or close freely.
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(SubscriptionRegistry::new());
//!
//! let subscription = registry.subscribe("fib-sync", |route: &RouteEvent| {
//!     println!("best path: {route}");
//! })?;
//!
//! // Bounded queue instead of a callback
//! let (queued, routes) = registry.subscribe_channel("exporter", 256)?;
//! for route in routes.iter() { /* ... */ }
//!
//! subscription.close()?;
//! ```

mod registry;
mod types;

pub use registry::SubscriptionRegistry;
pub use types::{DeliveryReport, RouteEventSink, Subscription};
