//! In-process engine that speaks no BGP at all.
//!
//! Best paths are injected by the caller with [`MemoryEngine::publish`]. Useful
//! for embedding the watcher where routes come from somewhere other than a
//! live speaker, and for exercising the watcher lifecycle in tests. Failures
//! of the session, neighbor and stop operations can be scripted.

use super::{BestPathEvent, BestPathWatcher, BgpEngine, EngineError};
use crate::config::{GlobalConfig, NeighborConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Default)]
struct EngineState {
    session: Option<GlobalConfig>,
    attempted_neighbors: Vec<IpAddr>,
    neighbors: Vec<NeighborConfig>,
    session_failure: Option<String>,
    neighbor_failures: HashMap<IpAddr, String>,
    stop_failure: Option<String>,
    watchers: HashMap<u64, Sender<BestPathEvent>>,
    next_watcher: u64,
    serving: bool,
    stopped: bool,
}

struct Shared {
    state: Mutex<EngineState>,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

/// Channel-backed [`BgpEngine`]. Clones share the same engine.
#[derive(Clone)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::default()),
                shutdown_tx,
                shutdown_rx,
            }),
        }
    }

    // --- Failure scripting ---

    /// Make the next `start_session` fail.
    pub fn fail_session_start(&self, reason: impl Into<String>) {
        self.shared.state.lock().session_failure = Some(reason.into());
    }

    /// Make `add_neighbor` fail for the given peer address.
    pub fn fail_neighbor(&self, neighbor: IpAddr, reason: impl Into<String>) {
        self.shared
            .state
            .lock()
            .neighbor_failures
            .insert(neighbor, reason.into());
    }

    /// Make `stop` fail.
    pub fn fail_stop(&self, reason: impl Into<String>) {
        self.shared.state.lock().stop_failure = Some(reason.into());
    }

    // --- Route injection ---

    /// Push a best-path event to every open watcher.
    ///
    /// Returns how many watchers received it.
    pub fn publish(&self, event: BestPathEvent) -> usize {
        let mut state = self.shared.state.lock();
        state
            .watchers
            .retain(|_, sender| sender.send(event.clone()).is_ok());
        state.watchers.len()
    }

    // --- Introspection ---

    /// Session parameters accepted by `start_session`.
    pub fn session(&self) -> Option<GlobalConfig> {
        self.shared.state.lock().session.clone()
    }

    /// Neighbors successfully added, in order.
    pub fn neighbors(&self) -> Vec<NeighborConfig> {
        self.shared.state.lock().neighbors.clone()
    }

    /// Every neighbor address `add_neighbor` was called with, in order.
    pub fn attempted_neighbors(&self) -> Vec<IpAddr> {
        self.shared.state.lock().attempted_neighbors.clone()
    }

    pub fn watcher_count(&self) -> usize {
        self.shared.state.lock().watchers.len()
    }

    /// True while `serve` is running.
    pub fn is_serving(&self) -> bool {
        self.shared.state.lock().serving
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BgpEngine for MemoryEngine {
    type Watcher = MemoryWatcher;

    fn serve(&self) {
        self.shared.state.lock().serving = true;
        // Returns on the stop signal or if every sender is gone.
        let _ = self.shared.shutdown_rx.recv();
        self.shared.state.lock().serving = false;
    }

    fn start_session(&self, global: &GlobalConfig) -> Result<(), EngineError> {
        let mut state = self.shared.state.lock();
        if let Some(reason) = state.session_failure.take() {
            return Err(reason.into());
        }
        state.session = Some(global.clone());
        Ok(())
    }

    fn add_neighbor(&self, neighbor: &NeighborConfig) -> Result<(), EngineError> {
        let mut state = self.shared.state.lock();
        state.attempted_neighbors.push(neighbor.neighbor_address);
        if state.session.is_none() {
            return Err("session not started".into());
        }
        if let Some(reason) = state.neighbor_failures.get(&neighbor.neighbor_address) {
            return Err(reason.clone().into());
        }
        state.neighbors.push(neighbor.clone());
        Ok(())
    }

    fn watch_best_path(&self) -> MemoryWatcher {
        let (sender, receiver) = unbounded();
        let mut state = self.shared.state.lock();
        let id = state.next_watcher;
        state.next_watcher += 1;
        state.watchers.insert(id, sender);

        MemoryWatcher {
            id,
            receiver,
            shared: Arc::clone(&self.shared),
        }
    }

    fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.shared.state.lock();
        if let Some(reason) = state.stop_failure.take() {
            return Err(reason.into());
        }
        state.stopped = true;
        state.watchers.clear();
        let _ = self.shared.shutdown_tx.try_send(());
        Ok(())
    }
}

/// Best-path watcher handed out by [`MemoryEngine`].
pub struct MemoryWatcher {
    id: u64,
    receiver: Receiver<BestPathEvent>,
    shared: Arc<Shared>,
}

impl BestPathWatcher for MemoryWatcher {
    fn events(&self) -> Receiver<BestPathEvent> {
        self.receiver.clone()
    }

    fn stop(&mut self) {
        self.shared.state.lock().watchers.remove(&self.id);
    }
}
