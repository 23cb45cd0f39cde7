//! Test harness - shared fixtures for cross-crate manager tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use kubedeck_catalog::{CatalogRegistry, KubernetesClusterEntity};
use kubedeck_manager::{
    ClusterManager, ClusterSession, ManagerConfig, ManagerHandle, NetworkNotifier, SessionError,
    SessionMap,
};
use kubedeck_store::{ClusterDescriptor, ClusterId, ClusterPreferences, ClusterStore};

/// Scriptable stand-in for a live cluster connection. Counts disconnects
/// and probes; the probe outcome can be flipped mid-test.
pub struct MockSession {
    disconnects: AtomicUsize,
    probes: AtomicUsize,
    probe_ok: AtomicBool,
}

impl MockSession {
    /// A session whose probes succeed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            disconnects: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            probe_ok: AtomicBool::new(true),
        })
    }

    /// A session whose probes fail.
    pub fn failing() -> Arc<Self> {
        let session = Self::new();
        session.set_probe_ok(false);
        session
    }

    /// How many times `disconnect` has been called.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// How many times `refresh_connection_status` has been called.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Sets whether subsequent probes succeed.
    pub fn set_probe_ok(&self, ok: bool) {
        self.probe_ok.store(ok, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterSession for MockSession {
    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn refresh_connection_status(&self) -> Result<(), SessionError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::ProbeFailed("mock probe refused".to_string()))
        }
    }
}

/// A store, catalog, and session map wired into a manager, with a
/// controllable network notifier.
pub struct ManagerTestBed {
    /// Authoritative cluster registry.
    pub store: Arc<ClusterStore>,
    /// Display-facing entity registry.
    pub catalog: Arc<CatalogRegistry>,
    /// Live session map the manager disconnects from.
    pub sessions: Arc<SessionMap>,
    /// Feeds offline and online transitions into the manager.
    pub notifier: NetworkNotifier,
    /// The manager under test.
    pub manager: ClusterManager,
}

impl ManagerTestBed {
    /// A test bed with default manager tuning.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// A test bed with the given removal linger.
    pub fn with_linger(linger: Duration) -> Self {
        Self::with_config(ManagerConfig {
            removal_linger: linger,
            ..ManagerConfig::default()
        })
    }

    /// A test bed with explicit manager tuning.
    pub fn with_config(config: ManagerConfig) -> Self {
        let store = Arc::new(ClusterStore::new());
        let catalog = Arc::new(CatalogRegistry::new());
        let sessions = Arc::new(SessionMap::new());
        let notifier = NetworkNotifier::new(config.network_channel_capacity);
        let manager = ClusterManager::new(
            store.clone(),
            catalog.clone(),
            sessions.clone(),
            config,
        );
        Self {
            store,
            catalog,
            sessions,
            notifier,
            manager,
        }
    }

    /// Registers a cluster record with a fixed id. The record starts
    /// disconnected, matching a freshly added cluster.
    pub fn add_cluster(&self, id: &str) -> ClusterId {
        self.store.add_cluster(ClusterDescriptor {
            id: Some(ClusterId::new(id)),
            kube_config_path: PathBuf::from("/kube/config"),
            context_name: format!("ctx-{}", id),
            preferences: ClusterPreferences::default(),
        })
    }

    /// Registers a cluster record already marked connected, online, and
    /// accessible.
    pub fn add_connected_cluster(&self, id: &str) -> ClusterId {
        let id = self.add_cluster(id);
        self.store
            .update(&id, |r| {
                r.disconnected = false;
                r.online = true;
                r.accessible = true;
            })
            .expect("cluster just added");
        id
    }

    /// Adds a catalog cluster entity whose uid matches a store id.
    pub fn add_entity(&self, uid: &str) {
        self.catalog.add(KubernetesClusterEntity::new(
            uid,
            uid,
            PathBuf::from("/kube/config"),
            format!("ctx-{}", uid),
        ));
    }

    /// Registers a fresh mock session for the given cluster and returns it.
    pub fn register_session(&self, id: &ClusterId) -> Arc<MockSession> {
        let session = MockSession::new();
        self.sessions.register(id.clone(), session.clone());
        session
    }

    /// Starts the manager subscribed to this bed's network notifier.
    pub fn start(&self) -> ManagerHandle {
        self.manager.start(self.notifier.subscribe())
    }
}

impl Default for ManagerTestBed {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a fmt subscriber for tests that want log output. Only the
/// first call wins; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
