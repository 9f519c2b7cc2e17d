//! Core types for the route watcher.

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A reachable route selected as best path by the BGP engine.
///
/// Immutable once built; fields are exposed through accessors only.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEvent {
    #[serde(rename = "as")]
    as_number: u32,
    prefix: String,
    next_hop: String,
}

impl RouteEvent {
    pub fn new(as_number: u32, prefix: impl Into<String>, next_hop: impl Into<String>) -> Self {
        Self {
            as_number,
            prefix: prefix.into(),
            next_hop: next_hop.into(),
        }
    }

    /// Autonomous system the route was learned from.
    pub fn as_number(&self) -> u32 {
        self.as_number
    }

    /// Advertised prefix in CIDR notation.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_hop(&self) -> &str {
        &self.next_hop
    }
}

impl fmt::Debug for RouteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RouteEvent({} via {}, AS{})",
            self.prefix, self.next_hop, self.as_number
        )
    }
}

impl fmt::Display for RouteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} (AS{})", self.prefix, self.next_hop, self.as_number)
    }
}

/// Caller-chosen name identifying a subscriber in the registry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Validate and wrap a subscriber name. Blank names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WatchError::InvalidSubscriber(name));
        }
        Ok(SubscriberId(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SubscriberId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where a [`RouteWatcher`](crate::RouteWatcher) is in its life.
///
/// Transitions only move forward:
/// `Uninitialized -> Initialized -> Running -> Stopping -> Stopped`,
/// with `Initialized -> Failed -> Stopped` when startup aborts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    Stopping,
    Stopped,
    /// Startup aborted part way; the engine may be half configured.
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}
