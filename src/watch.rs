//! Best-path watch loop.
//!
//! Consumes the engine's best-path stream on a dedicated thread, decodes each
//! advertised path into a [`RouteEvent`] and hands it to every current
//! subscriber before looking at the next path. A path whose AS path does not
//! decode is skipped on its own; the rest of its event is still delivered.

use crate::engine::{BestPathEvent, Path};
use crate::error::PathDecodeError;
use crate::subscriptions::SubscriptionRegistry;
use crate::types::RouteEvent;
use crossbeam_channel::{select, Receiver, TryRecvError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decode one best path into a route event.
///
/// The AS path must be a single unsigned decimal AS number: ASCII digits
/// only, no sign, no separators.
pub fn decode_path(path: &Path) -> Result<RouteEvent, PathDecodeError> {
    let as_path = path.as_path();
    if !as_path.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathDecodeError::NotDecimal(as_path.to_string()));
    }
    let as_number = as_path
        .parse::<u32>()
        .map_err(|source| PathDecodeError::Parse {
            as_path: as_path.to_string(),
            source,
        })?;
    Ok(RouteEvent::new(as_number, path.nlri(), path.next_hop()))
}

/// Counters maintained by the watch loop.
#[derive(Debug, Default)]
pub struct WatchStats {
    events_received: AtomicU64,
    paths_delivered: AtomicU64,
    paths_skipped: AtomicU64,
    callback_panics: AtomicU64,
}

/// Point-in-time copy of [`WatchStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WatchStatsSnapshot {
    /// Best-path events taken off the engine stream.
    pub events_received: u64,
    /// Paths decoded and fanned out.
    pub paths_delivered: u64,
    /// Paths dropped because their AS path did not decode.
    pub paths_skipped: u64,
    pub callback_panics: u64,
}

impl WatchStats {
    pub fn snapshot(&self) -> WatchStatsSnapshot {
        WatchStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            paths_delivered: self.paths_delivered.load(Ordering::Relaxed),
            paths_skipped: self.paths_skipped.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }
}

/// Why the watch loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop signal fired.
    Stopped,
    /// The engine closed the best-path stream.
    StreamClosed,
}

/// Single-consumer loop translating best paths into route events.
pub struct WatchLoop {
    name: String,
    stop: Receiver<()>,
    events: Receiver<BestPathEvent>,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<WatchStats>,
}

impl WatchLoop {
    /// `stop` fires when it yields a message or its sender is dropped.
    pub fn new(
        name: impl Into<String>,
        stop: Receiver<()>,
        events: Receiver<BestPathEvent>,
        registry: Arc<SubscriptionRegistry>,
        stats: Arc<WatchStats>,
    ) -> Self {
        Self {
            name: name.into(),
            stop,
            events,
            registry,
            stats,
        }
    }

    /// Run until stopped or until the engine closes the stream.
    pub fn run(self) -> LoopExit {
        loop {
            // A pending stop wins over pending events.
            if self.stop_requested() {
                break;
            }

            select! {
                recv(self.stop) -> _ => break,
                recv(self.events) -> msg => match msg {
                    Ok(event) => self.handle_event(&event),
                    Err(_) => {
                        warn!(watcher = %self.name, "Best-path stream closed by engine");
                        return LoopExit::StreamClosed;
                    }
                },
            }
        }

        debug!(watcher = %self.name, "Stop watching best paths");
        LoopExit::Stopped
    }

    /// Decode and deliver every path of one event, in order.
    pub fn handle_event(&self, event: &BestPathEvent) {
        self.stats.events_received.fetch_add(1, Ordering::Relaxed);

        for path in &event.paths {
            let route = match decode_path(path) {
                Ok(route) => route,
                Err(e) => {
                    self.stats.paths_skipped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        watcher = %self.name,
                        as_path = e.as_path(),
                        error = %e,
                        "Ignoring path due to parse error"
                    );
                    continue;
                }
            };

            debug!(
                watcher = %self.name,
                as_number = route.as_number(),
                prefix = route.prefix(),
                next_hop = route.next_hop(),
                "Delivering best path to subscribers"
            );
            let report = self.registry.deliver(&route);
            self.stats.paths_delivered.fetch_add(1, Ordering::Relaxed);
            if report.panicked > 0 {
                self.stats
                    .callback_panics
                    .fetch_add(report.panicked as u64, Ordering::Relaxed);
            }
        }
    }

    fn stop_requested(&self) -> bool {
        !matches!(self.stop.try_recv(), Err(TryRecvError::Empty))
    }
}
