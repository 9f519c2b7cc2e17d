//! Watcher and BGP session configuration.
//!
//! The watcher does not interpret session parameters itself; they are handed
//! to the engine unchanged. Configuration can be built in code or loaded from
//! JSON:
//!
//! ```json
//! {
//!   "name": "bgp-to-vpp",
//!   "session": {
//!     "global": { "as": 65000, "router_id": "172.18.0.2", "listen_port": -1 },
//!     "neighbors": [
//!       { "neighbor_address": "172.18.0.3", "peer_as": 65001 }
//!     ]
//!   }
//! }
//! ```

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

/// Default BGP port.
const DEFAULT_LISTEN_PORT: i32 = 179;

fn default_name() -> String {
    "routewatch".to_string()
}

fn default_listen_port() -> i32 {
    DEFAULT_LISTEN_PORT
}

/// Top-level watcher configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Name used in logs and background thread names.
    #[serde(default = "default_name")]
    pub name: String,

    /// BGP session to bring up. Initialization fails without it.
    #[serde(default)]
    pub session: Option<SessionConfig>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            session: None,
        }
    }
}

impl WatcherConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WatcherConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check fields the watcher relies on. The name ends up in thread names,
    /// which cannot contain NUL.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WatchError::Config("name must not be empty".to_string()));
        }
        if self.name.contains('\0') {
            return Err(WatchError::Config(format!(
                "name {:?} must not contain NUL",
                self.name
            )));
        }
        Ok(())
    }
}

/// Everything needed to bring up one BGP speaker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub global: GlobalConfig,

    /// Peers to provision, in order, once the session is up.
    #[serde(default)]
    pub neighbors: Vec<NeighborConfig>,
}

impl SessionConfig {
    pub fn new(global: GlobalConfig) -> Self {
        Self {
            global,
            neighbors: Vec::new(),
        }
    }

    pub fn with_neighbor(mut self, neighbor: NeighborConfig) -> Self {
        self.neighbors.push(neighbor);
        self
    }
}

/// Global speaker parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Local AS number.
    #[serde(rename = "as")]
    pub as_number: u32,

    pub router_id: Ipv4Addr,

    /// TCP port to accept peers on. Negative disables listening.
    #[serde(default = "default_listen_port")]
    pub listen_port: i32,

    #[serde(default)]
    pub listen_addresses: Vec<IpAddr>,
}

impl GlobalConfig {
    pub fn new(as_number: u32, router_id: Ipv4Addr) -> Self {
        Self {
            as_number,
            router_id,
            listen_port: DEFAULT_LISTEN_PORT,
            listen_addresses: Vec::new(),
        }
    }
}

/// A configured BGP peer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeighborConfig {
    pub neighbor_address: IpAddr,
    pub peer_as: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NeighborConfig {
    pub fn new(neighbor_address: IpAddr, peer_as: u32) -> Self {
        Self {
            neighbor_address,
            peer_as,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"{
        "name": "bgp-to-vpp",
        "session": {
            "global": { "as": 65000, "router_id": "172.18.0.2", "listen_port": -1 },
            "neighbors": [
                { "neighbor_address": "172.18.0.3", "peer_as": 65001 },
                { "neighbor_address": "2001:db8::1", "peer_as": 65002, "description": "v6 peer" }
            ]
        }
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = WatcherConfig::from_json_str(FULL).unwrap();
        assert_eq!(config.name, "bgp-to-vpp");

        let session = config.session.unwrap();
        assert_eq!(session.global.as_number, 65000);
        assert_eq!(session.global.router_id, Ipv4Addr::new(172, 18, 0, 2));
        assert_eq!(session.global.listen_port, -1);
        assert_eq!(session.neighbors.len(), 2);
        assert_eq!(session.neighbors[1].peer_as, 65002);
        assert_eq!(session.neighbors[1].description.as_deref(), Some("v6 peer"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = WatcherConfig::from_json_str(
            r#"{ "session": { "global": { "as": 1, "router_id": "10.0.0.1" } } }"#,
        )
        .unwrap();
        assert_eq!(config.name, "routewatch");
        let session = config.session.unwrap();
        assert_eq!(session.global.listen_port, 179);
        assert!(session.neighbors.is_empty());
    }

    #[test]
    fn test_missing_session_is_not_a_parse_error() {
        let config = WatcherConfig::from_json_str(r#"{ "name": "idle" }"#).unwrap();
        assert!(config.session.is_none());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            WatcherConfig::from_json_str("{ not json"),
            Err(WatchError::Config(_))
        ));
        assert!(matches!(
            WatcherConfig::from_json_str(r#"{ "name": "  " }"#),
            Err(WatchError::Config(_))
        ));
        assert!(matches!(
            WatcherConfig::from_json_str(r#"{ "name": "bgp\u0000x" }"#),
            Err(WatchError::Config(_))
        ));
        // Router ID must be IPv4
        assert!(matches!(
            WatcherConfig::from_json_str(
                r#"{ "session": { "global": { "as": 1, "router_id": "::1" } } }"#
            ),
            Err(WatchError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = WatcherConfig::from_file(file.path()).unwrap();
        assert_eq!(config.name, "bgp-to-vpp");

        let missing = WatcherConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(WatchError::Io(_))));
    }
}
