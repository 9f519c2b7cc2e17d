//! # Route Watch
//!
//! Brings up an embedded BGP speaker and turns its best-path decisions into a
//! stream of small, stable route events for in-process consumers.
//!
//! ## Core Concepts
//!
//! - **Engine**: the BGP speaker, reached only through [`BgpEngine`]
//! - **RouteWatcher**: starts the engine in order and shuts it down in reverse
//! - **Watch loop**: one thread decoding best paths into [`RouteEvent`]s
//! - **Registry**: named subscribers, each receiving every later route event
//!
//! ## Example
//!
//! ```ignore
//! use routewatch::{MemoryEngine, RouteWatcher, WatcherConfig};
//!
//! let config = WatcherConfig::from_file("bgp.json")?;
//! let mut watcher = RouteWatcher::new();
//! watcher.initialize(config, |_| MemoryEngine::new())?;
//!
//! // Subscribe before start to see every route
//! let subscription = watcher.subscribe("fib", |route| {
//!     println!("{route}");
//! })?;
//!
//! watcher.start()?;
//! // ...
//! subscription.close()?;
//! watcher.stop()?;
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod subscriptions;
pub mod types;
pub mod watch;

// Re-exports
pub use config::{GlobalConfig, NeighborConfig, SessionConfig, WatcherConfig};
pub use controller::RouteWatcher;
pub use engine::{
    BestPathEvent, BestPathWatcher, BgpEngine, EngineError, MemoryEngine, MemoryWatcher, Path,
};
pub use error::{PathDecodeError, Result, WatchError};
pub use subscriptions::{DeliveryReport, RouteEventSink, Subscription, SubscriptionRegistry};
pub use types::{LifecycleState, RouteEvent, SubscriberId};
pub use watch::{decode_path, LoopExit, WatchLoop, WatchStats, WatchStatsSnapshot};
