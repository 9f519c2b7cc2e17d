//! Startup failure and error reporting tests.

use routewatch::{
    BgpEngine, GlobalConfig, LifecycleState, MemoryEngine, NeighborConfig, RouteWatcher,
    SessionConfig, WatchError, WatcherConfig,
};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};

fn neighbor(addr: &str, peer_as: u32) -> NeighborConfig {
    NeighborConfig::new(addr.parse().unwrap(), peer_as)
}

fn three_neighbors() -> WatcherConfig {
    let session = SessionConfig::new(GlobalConfig::new(65000, Ipv4Addr::new(10, 0, 0, 1)))
        .with_neighbor(neighbor("10.0.0.2", 65001))
        .with_neighbor(neighbor("10.0.0.3", 65002))
        .with_neighbor(neighbor("10.0.0.4", 65003));
    WatcherConfig::new("bgp-errors").with_session(session)
}

fn initialized(engine: &MemoryEngine, config: WatcherConfig) -> RouteWatcher<MemoryEngine> {
    let mut watcher = RouteWatcher::new();
    let engine = engine.clone();
    watcher.initialize(config, move |_| engine).unwrap();
    watcher
}

// --- Initialization ---

#[test]
fn test_missing_session_config() {
    let mut watcher = RouteWatcher::<MemoryEngine>::new();

    let result = watcher.initialize(WatcherConfig::default(), |_| MemoryEngine::new());

    let err = result.unwrap_err();
    assert!(matches!(err, WatchError::ConfigMissing));
    assert_eq!(
        err.to_string(),
        "cannot initialize without a BGP session configuration"
    );
}

// --- Startup ---

#[test]
fn test_session_start_failure_aborts_startup() {
    let engine = MemoryEngine::new();
    engine.fail_session_start("router id in use");
    let mut watcher = initialized(&engine, three_neighbors());

    let err = watcher.start().unwrap_err();

    assert!(matches!(err, WatchError::SessionStartFailed(_)));
    assert_eq!(err.source().unwrap().to_string(), "router id in use");
    assert_eq!(watcher.state(), LifecycleState::Failed);
    assert!(engine.attempted_neighbors().is_empty());
    assert_eq!(engine.watcher_count(), 0);
}

#[test]
fn test_second_neighbor_failure_skips_third() {
    let engine = MemoryEngine::new();
    let bad: IpAddr = "10.0.0.3".parse().unwrap();
    engine.fail_neighbor(bad, "peer AS mismatch");
    let mut watcher = initialized(&engine, three_neighbors());

    let err = watcher.start().unwrap_err();

    match err {
        WatchError::NeighborAddFailed { neighbor, ref source } => {
            assert_eq!(neighbor, bad);
            assert_eq!(source.to_string(), "peer AS mismatch");
        }
        other => panic!("expected NeighborAddFailed, got {:?}", other),
    }
    let attempted: Vec<String> = engine
        .attempted_neighbors()
        .iter()
        .map(|a| a.to_string())
        .collect();
    assert_eq!(attempted, vec!["10.0.0.2", "10.0.0.3"]);
    assert_eq!(engine.neighbors().len(), 1);
    assert_eq!(engine.watcher_count(), 0);
    assert_eq!(watcher.state(), LifecycleState::Failed);
}

#[test]
fn test_failed_watcher_cannot_restart() {
    let engine = MemoryEngine::new();
    engine.fail_session_start("nope");
    let mut watcher = initialized(&engine, three_neighbors());

    assert!(watcher.start().is_err());
    assert!(matches!(
        watcher.start(),
        Err(WatchError::InvalidState {
            operation: "start",
            state: LifecycleState::Failed
        })
    ));
}

#[test]
fn test_failed_watcher_releases_engine_on_stop() {
    let engine = MemoryEngine::new();
    engine.fail_session_start("nope");
    let mut watcher = initialized(&engine, three_neighbors());
    assert!(watcher.start().is_err());

    watcher.stop().unwrap();

    assert_eq!(watcher.state(), LifecycleState::Stopped);
    assert!(engine.is_stopped());
    assert!(!engine.is_serving());
}

// --- Shutdown ---

#[test]
fn test_engine_stop_error_is_reported() {
    let engine = MemoryEngine::new();
    let mut watcher = initialized(&engine, three_neighbors());
    watcher.start().unwrap();
    engine.fail_stop("graceful restart pending");

    let err = watcher.stop().unwrap_err();

    assert!(matches!(err, WatchError::EngineStop(_)));
    assert_eq!(
        err.to_string(),
        "BGP engine failed to stop: graceful restart pending"
    );
    // Watch side is torn down regardless
    assert_eq!(watcher.state(), LifecycleState::Stopped);
    assert_eq!(engine.watcher_count(), 0);
    assert!(watcher.stop().is_ok());

    // Release the engine thread left behind
    engine.stop().unwrap();
}

#[test]
fn test_stop_before_start_rejected() {
    let engine = MemoryEngine::new();
    let mut watcher = initialized(&engine, three_neighbors());

    assert!(matches!(
        watcher.stop(),
        Err(WatchError::InvalidState {
            operation: "stop",
            state: LifecycleState::Initialized
        })
    ));
    assert!(!engine.is_stopped());
}

// --- Subscriptions ---

#[test]
fn test_blank_subscriber_rejected() {
    let watcher = RouteWatcher::<MemoryEngine>::new();

    let err = watcher.subscribe("", |_| {}).unwrap_err();
    assert!(matches!(err, WatchError::InvalidSubscriber(_)));
    assert!(watcher.registry().is_empty());
}
