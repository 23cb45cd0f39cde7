//! Manager loop integration tests.
//!
//! Runs the spawned manager against real registries and mock sessions:
//! reconciliation through the live loop, removal sweeps under paused time,
//! network transitions, and shutdown ordering.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time;

use kubedeck_catalog::{CatalogRegistry, EntityPhase};
use kubedeck_manager::{
    catalog_entity_from_cluster, AgentConfig, ClusterManager, NetworkNotifier, SessionMap,
};
use kubedeck_store::{ClusterId, ClusterStore};

use crate::harness::{init_tracing, ManagerTestBed, MockSession};

async fn settle() {
    time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_startup_pass_reconciles_catalog() {
    init_tracing();
    let bed = ManagerTestBed::new();
    bed.add_connected_cluster("c1");
    bed.add_entity("c1");

    let handle = bed.start();

    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);
    assert!(entity.status.active);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_store_change_propagates_while_running() {
    let bed = ManagerTestBed::new();
    let id = bed.add_cluster("c1");
    bed.add_entity("c1");
    let handle = bed.start();

    bed.store.update(&id, |r| r.disconnected = false).unwrap();
    settle().await;

    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_catalog_entity_propagates_to_store() {
    let bed = ManagerTestBed::new();
    let handle = bed.start();

    bed.add_entity("u1");
    settle().await;

    let record = bed.store.get(&ClusterId::new("u1")).unwrap();
    assert_eq!(record.display_name(), "u1");
    assert_eq!(record.context_name, "ctx-u1");

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_converged_state_stops_publishing() {
    let bed = ManagerTestBed::new();
    let id = bed.add_cluster("c1");
    bed.add_entity("c1");
    let handle = bed.start();
    settle().await;

    let mut store_rx = bed.store.subscribe();
    let mut catalog_rx = bed.catalog.subscribe_clusters();

    bed.store.update(&id, |r| r.disconnected = false).unwrap();
    assert!(store_rx.has_changed().unwrap());
    store_rx.borrow_and_update();

    settle().await;

    // The catalog caught up exactly once.
    assert!(catalog_rx.has_changed().unwrap());
    catalog_rx.borrow_and_update();
    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);

    settle().await;

    // No echo: the write that closed the loop was value-equal on both
    // sides, so neither registry published again.
    assert!(!store_rx.has_changed().unwrap());
    assert!(!catalog_rx.has_changed().unwrap());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reverse_direction_does_not_echo() {
    let bed = ManagerTestBed::new();
    let handle = bed.start();
    settle().await;

    bed.add_entity("u1");
    let mut catalog_rx = bed.catalog.subscribe_clusters();

    settle().await;

    assert!(bed.store.get(&ClusterId::new("u1")).is_some());
    assert!(!catalog_rx.has_changed().unwrap());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_removals_inside_linger_flush_as_one_batch() {
    let bed = ManagerTestBed::with_linger(Duration::from_millis(250));
    let a = bed.add_cluster("a");
    let b = bed.add_cluster("b");
    let session_a = bed.register_session(&a);
    let session_b = bed.register_session(&b);
    let handle = bed.start();
    settle().await;

    bed.store.mark_removed(&a).unwrap();
    time::sleep(Duration::from_millis(100)).await;
    bed.store.mark_removed(&b).unwrap();

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session_a.disconnect_count(), 0);
    assert_eq!(session_b.disconnect_count(), 0);

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session_a.disconnect_count(), 1);
    assert_eq!(session_b.disconnect_count(), 1);
    assert_eq!(bed.store.removed_count(), 0);
    assert!(bed.sessions.get(&a).is_none());
    assert!(bed.sessions.get(&b).is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_spaced_removals_flush_separately() {
    let bed = ManagerTestBed::with_linger(Duration::from_millis(250));
    let a = bed.add_cluster("a");
    let b = bed.add_cluster("b");
    let session_a = bed.register_session(&a);
    let session_b = bed.register_session(&b);
    let handle = bed.start();
    settle().await;

    bed.store.mark_removed(&a).unwrap();
    time::sleep(Duration::from_millis(400)).await;
    assert_eq!(session_a.disconnect_count(), 1);
    assert_eq!(session_b.disconnect_count(), 0);

    bed.store.mark_removed(&b).unwrap();
    time::sleep(Duration::from_millis(400)).await;
    assert_eq!(session_b.disconnect_count(), 1);
    assert_eq!(bed.store.removed_count(), 0);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_offline_forces_flags_but_not_disconnection() {
    let bed = ManagerTestBed::new();
    let a = bed.add_connected_cluster("a");
    let b = bed.add_connected_cluster("b");
    let dormant = bed.add_cluster("z");
    let session_a = bed.register_session(&a);
    let session_b = bed.register_session(&b);
    let session_z = bed.register_session(&dormant);
    bed.add_entity("a");

    let handle = bed.start();
    settle().await;

    bed.notifier.notify_offline();
    settle().await;

    for id in [&a, &b] {
        let record = bed.store.get(id).unwrap();
        assert!(!record.online);
        assert!(!record.accessible);
        assert!(!record.disconnected);
    }
    assert_eq!(session_a.probe_count(), 1);
    assert_eq!(session_b.probe_count(), 1);
    assert_eq!(session_z.probe_count(), 0);

    // Losing the network is not a disconnect, so the entity stays
    // connected until a probe or the owner says otherwise.
    let entity = bed.catalog.get_cluster("a").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_online_probes_without_touching_flags() {
    let bed = ManagerTestBed::new();
    let id = bed.add_connected_cluster("a");
    let session = bed.register_session(&id);

    let handle = bed.start();
    settle().await;

    bed.notifier.notify_online();
    settle().await;

    let record = bed.store.get(&id).unwrap();
    assert!(record.online);
    assert!(record.accessible);
    assert_eq!(session.probe_count(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_probes_leave_manager_running() {
    let bed = ManagerTestBed::new();
    let id = bed.add_connected_cluster("a");
    let session = MockSession::failing();
    bed.sessions.register(id.clone(), session.clone());

    let handle = bed.start();
    settle().await;

    bed.notifier.notify_offline();
    settle().await;
    bed.notifier.notify_online();
    settle().await;

    assert_eq!(session.probe_count(), 2);
    assert!(handle.is_running());

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_disconnects_all_sessions() {
    let bed = ManagerTestBed::new();
    let a = bed.add_connected_cluster("a");
    let b = bed.add_cluster("b");
    let session_a = bed.register_session(&a);
    let session_b = bed.register_session(&b);

    let handle = bed.start();
    settle().await;

    handle.shutdown().await.unwrap();

    assert_eq!(session_a.disconnect_count(), 1);
    assert_eq!(session_b.disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_agent_wiring_from_config_file() {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    writeln!(
        file,
        r#"
removal_linger_ms = 100

[[clusters]]
id = "alpha"
kubeconfig_path = "/kube/alpha"
context = "alpha-ctx"
name = "Alpha"

[[clusters]]
id = "beta"
kubeconfig_path = "/kube/beta"
context = "beta-ctx"
        "#
    )
    .unwrap();

    let config = AgentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.removal_linger_ms, 100);

    let store = Arc::new(ClusterStore::new());
    let catalog = Arc::new(CatalogRegistry::new());
    let sessions = Arc::new(SessionMap::new());

    let seeded = config.seed_store(&store);
    for id in &seeded {
        let record = store.get(id).unwrap();
        catalog.add(catalog_entity_from_cluster(&record));
    }

    let manager_config = config.manager_config();
    let notifier = NetworkNotifier::new(manager_config.network_channel_capacity);
    let manager = ClusterManager::new(store.clone(), catalog.clone(), sessions, manager_config);
    let handle = manager.start(notifier.subscribe());
    settle().await;

    assert_eq!(store.len(), 2);
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get_cluster("alpha").unwrap().metadata.name, "Alpha");
    assert_eq!(
        catalog.get_cluster("beta").unwrap().metadata.name,
        "beta-ctx"
    );

    handle.shutdown().await.unwrap();
}
