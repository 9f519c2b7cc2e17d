//! Contract between the watcher and the BGP speaker it drives.
//!
//! The speaker itself (sessions, path selection, wire protocol) lives outside
//! this crate. The watcher only needs to start it, provision peers, listen for
//! best-path changes and stop it again.

pub mod memory;

use crate::config::{GlobalConfig, NeighborConfig};
use crossbeam_channel::Receiver;

pub use crate::error::EngineError;
pub use memory::{MemoryEngine, MemoryWatcher};

/// One advertised path inside a best-path event, as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    as_path: String,
    nlri: String,
    next_hop: String,
}

impl Path {
    pub fn new(
        as_path: impl Into<String>,
        nlri: impl Into<String>,
        next_hop: impl Into<String>,
    ) -> Self {
        Self {
            as_path: as_path.into(),
            nlri: nlri.into(),
            next_hop: next_hop.into(),
        }
    }

    /// AS path in the engine's textual form.
    pub fn as_path(&self) -> &str {
        &self.as_path
    }

    /// Reachability prefix (NLRI).
    pub fn nlri(&self) -> &str {
        &self.nlri
    }

    pub fn next_hop(&self) -> &str {
        &self.next_hop
    }
}

/// New best paths selected by the engine. One event may batch several paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BestPathEvent {
    pub paths: Vec<Path>,
}

impl BestPathEvent {
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    pub fn single(path: Path) -> Self {
        Self { paths: vec![path] }
    }
}

/// Subscription to the engine's best-path stream.
pub trait BestPathWatcher: Send + 'static {
    /// Receiving side of the stream. Disconnects when the engine goes away.
    fn events(&self) -> Receiver<BestPathEvent>;

    /// Stop producing events for this watcher.
    fn stop(&mut self);
}

/// A BGP speaker the watcher can drive.
///
/// Shared between the controller and the engine's own run-loop thread, so
/// every operation takes `&self`.
pub trait BgpEngine: Send + Sync + 'static {
    type Watcher: BestPathWatcher;

    /// Run the engine's processing loop. Blocks until [`stop`](Self::stop)
    /// has been called.
    fn serve(&self);

    fn start_session(&self, global: &GlobalConfig) -> Result<(), EngineError>;

    fn add_neighbor(&self, neighbor: &NeighborConfig) -> Result<(), EngineError>;

    /// Subscribe to best-path changes.
    fn watch_best_path(&self) -> Self::Watcher;

    fn stop(&self) -> Result<(), EngineError>;
}
