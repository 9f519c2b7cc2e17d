//! Lifecycle controller tying the engine, watch loop and registry together.

use crate::config::{GlobalConfig, NeighborConfig, SessionConfig, WatcherConfig};
use crate::engine::{BestPathWatcher, BgpEngine};
use crate::error::{Result, WatchError};
use crate::subscriptions::{SubscriptionRegistry, Subscription};
use crate::types::{LifecycleState, RouteEvent};
use crate::watch::{LoopExit, WatchLoop, WatchStats, WatchStatsSnapshot};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Drives a BGP engine and forwards its best paths to subscribers.
///
/// Startup order is fixed: engine run loop, session, neighbors (in listed
/// order), then the watch loop. Shutdown releases them in reverse. Subscribers
/// registered before [`start`](Self::start) see every route the engine
/// selects; later subscribers only see what comes after them.
pub struct RouteWatcher<E: BgpEngine> {
    name: String,
    state: LifecycleState,

    /// Session parameters, present once initialized.
    session: Option<SessionConfig>,

    /// Engine, shared only with its own run-loop thread.
    engine: Option<Arc<E>>,
    engine_thread: Option<JoinHandle<()>>,

    /// Best-path subscription feeding the watch loop.
    watcher: Option<E::Watcher>,
    /// Dropping the sender stops the watch loop.
    stop_signal: Option<Sender<()>>,
    /// The one pending shutdown-wait.
    watch_thread: Option<JoinHandle<LoopExit>>,

    registry: Arc<SubscriptionRegistry>,
    stats: Arc<WatchStats>,
}

impl<E: BgpEngine> RouteWatcher<E> {
    /// Create an uninitialized watcher with an empty registry.
    pub fn new() -> Self {
        Self {
            name: WatcherConfig::default().name,
            state: LifecycleState::Uninitialized,
            session: None,
            engine: None,
            engine_thread: None,
            watcher: None,
            stop_signal: None,
            watch_thread: None,
            registry: Arc::new(SubscriptionRegistry::new()),
            stats: Arc::new(WatchStats::default()),
        }
    }

    /// Check configuration and build the engine.
    ///
    /// Fails with [`WatchError::Config`] when `config` does not validate and
    /// with [`WatchError::ConfigMissing`] when it carries no session; `build`
    /// is not called in either case.
    pub fn initialize<F>(&mut self, config: WatcherConfig, build: F) -> Result<()>
    where
        F: FnOnce(&SessionConfig) -> E,
    {
        self.expect_state("initialize", LifecycleState::Uninitialized)?;
        debug!(watcher = %config.name, "Initializing route watcher");
        config.validate()?;

        let session = config.session.ok_or(WatchError::ConfigMissing)?;
        let engine = build(&session);

        self.name = config.name;
        self.session = Some(session);
        self.engine = Some(Arc::new(engine));
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    /// Bring the engine up and start forwarding best paths.
    ///
    /// The first session or neighbor failure aborts startup and leaves the
    /// watcher [`Failed`](LifecycleState::Failed). Nothing is rolled back;
    /// call [`stop`](Self::stop) to release the engine and discard the watcher.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state("start", LifecycleState::Initialized)?;
        let (engine, session) = match (&self.engine, &self.session) {
            (Some(engine), Some(session)) => (Arc::clone(engine), session.clone()),
            _ => {
                return Err(WatchError::InvalidState {
                    operation: "start",
                    state: self.state,
                })
            }
        };

        match self.bring_up(&engine, &session) {
            Ok(()) => {
                self.state = LifecycleState::Running;
                info!(
                    watcher = %self.name,
                    neighbors = session.neighbors.len(),
                    subscribers = self.registry.len(),
                    "Route watcher started"
                );
                Ok(())
            }
            Err(e) => {
                self.state = LifecycleState::Failed;
                Err(e)
            }
        }
    }

    /// Stop the watch loop, then the best-path subscription, then the engine.
    ///
    /// Blocks until the watch loop has exited, which includes waiting for a
    /// callback that is currently running. Stopping an already stopped watcher
    /// is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Running => {
                info!(watcher = %self.name, "Stopping route watcher");
                self.state = LifecycleState::Stopping;
            }
            LifecycleState::Failed => {
                info!(watcher = %self.name, "Releasing engine of failed route watcher");
            }
            LifecycleState::Stopped => {
                debug!(watcher = %self.name, "Route watcher already stopped");
                return Ok(());
            }
            state => {
                return Err(WatchError::InvalidState {
                    operation: "stop",
                    state,
                })
            }
        }

        let result = self.teardown();
        self.state = LifecycleState::Stopped;
        result
    }

    // --- Subscriptions ---

    /// Register `callback` for route events. See
    /// [`SubscriptionRegistry::subscribe`].
    pub fn subscribe<F>(&self, subscriber: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&RouteEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(subscriber, callback)
    }

    /// Register a bounded queue for route events. See
    /// [`SubscriptionRegistry::subscribe_channel`].
    pub fn subscribe_channel(
        &self,
        subscriber: &str,
        buffer_size: usize,
    ) -> Result<(Subscription, Receiver<RouteEvent>)> {
        self.registry.subscribe_channel(subscriber, buffer_size)
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Shared registry, for handing to components that subscribe later.
    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn stats(&self) -> WatchStatsSnapshot {
        self.stats.snapshot()
    }

    // --- Internal ---

    fn expect_state(&self, operation: &'static str, expected: LifecycleState) -> Result<()> {
        if self.state != expected {
            return Err(WatchError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn bring_up(&mut self, engine: &Arc<E>, session: &SessionConfig) -> Result<()> {
        self.spawn_engine(engine)?;
        self.start_session(engine, &session.global)?;
        self.add_known_neighbors(engine, &session.neighbors)?;
        self.spawn_watch_loop(engine)
    }

    /// Run the engine's own loop in the background.
    fn spawn_engine(&mut self, engine: &Arc<E>) -> Result<()> {
        let runner = Arc::clone(engine);
        let handle = thread::Builder::new()
            .name(format!("{}-engine", self.name))
            .spawn(move || runner.serve())
            .map_err(WatchError::Spawn)?;
        self.engine_thread = Some(handle);
        Ok(())
    }

    fn start_session(&self, engine: &E, global: &GlobalConfig) -> Result<()> {
        if let Err(e) = engine.start_session(global) {
            error!(watcher = %self.name, error = %e, "Failed to start BGP session");
            return Err(WatchError::SessionStartFailed(e));
        }
        debug!(
            watcher = %self.name,
            as_number = global.as_number,
            router_id = %global.router_id,
            "BGP session started"
        );
        Ok(())
    }

    /// Add configured neighbors in order, stopping at the first failure.
    fn add_known_neighbors(&self, engine: &E, neighbors: &[NeighborConfig]) -> Result<()> {
        for neighbor in neighbors {
            if let Err(e) = engine.add_neighbor(neighbor) {
                error!(
                    watcher = %self.name,
                    neighbor = %neighbor.neighbor_address,
                    error = %e,
                    "Failed to add BGP neighbor"
                );
                return Err(WatchError::NeighborAddFailed {
                    neighbor: neighbor.neighbor_address,
                    source: e,
                });
            }
            debug!(
                watcher = %self.name,
                neighbor = %neighbor.neighbor_address,
                peer_as = neighbor.peer_as,
                "BGP neighbor added"
            );
        }
        Ok(())
    }

    fn spawn_watch_loop(&mut self, engine: &E) -> Result<()> {
        let (stop_tx, stop_rx) = bounded(1);
        let watcher = engine.watch_best_path();
        let watch = WatchLoop::new(
            self.name.clone(),
            stop_rx,
            watcher.events(),
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
        );
        self.watcher = Some(watcher);

        let handle = thread::Builder::new()
            .name(format!("{}-watch", self.name))
            .spawn(move || watch.run())
            .map_err(WatchError::Spawn)?;

        self.stop_signal = Some(stop_tx);
        self.watch_thread = Some(handle);
        Ok(())
    }

    /// Release everything acquired during startup, newest first.
    fn teardown(&mut self) -> Result<()> {
        drop(self.stop_signal.take());
        if let Some(handle) = self.watch_thread.take() {
            match handle.join() {
                Ok(exit) => debug!(watcher = %self.name, ?exit, "Watch loop finished"),
                Err(_) => error!(watcher = %self.name, "Watch loop panicked"),
            }
        }

        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }

        let result = match self.engine.take() {
            Some(engine) => engine.stop().map_err(WatchError::EngineStop),
            None => Ok(()),
        };

        match &result {
            Ok(()) => {
                if let Some(handle) = self.engine_thread.take() {
                    if handle.join().is_err() {
                        error!(watcher = %self.name, "BGP engine run loop panicked");
                    }
                }
                info!(watcher = %self.name, "Route watcher stopped");
            }
            // The run loop may never return; leave its thread detached.
            Err(e) => error!(watcher = %self.name, error = %e, "Failed to stop BGP engine"),
        }

        result
    }
}

impl<E: BgpEngine> Default for RouteWatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BgpEngine> Drop for RouteWatcher<E> {
    fn drop(&mut self) {
        // Best-effort shutdown if the owner forgot to stop
        if matches!(self.state, LifecycleState::Running | LifecycleState::Failed) {
            if let Err(e) = self.stop() {
                warn!(watcher = %self.name, error = %e, "Route watcher shutdown on drop failed");
            }
        }
    }
}
