//! Manager task lifecycle.
//!
//! One spawned task owns every reaction: reconciliation in both directions,
//! the debounced removal sweep, and network transition handling. Connectivity
//! probes are the only work spawned off the task, fire-and-forget, so one
//! slow cluster cannot stall the rest. Shutdown disconnects every registered
//! session before the task lets its subscriptions go.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use kubedeck_catalog::{CatalogRegistry, KubernetesClusterEntity};
use kubedeck_store::{ClusterId, ClusterMeta, ClusterRecord, ClusterStore};

use crate::network::NetworkEvent;
use crate::reconcile;
use crate::routing::{self, RouteRequest};
use crate::session::SessionMap;

/// Tuning knobs for the manager task.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// How long the removal sweep lingers after the last arrival before
    /// flushing the batch.
    pub removal_linger: Duration,
    /// Capacity of the network transition broadcast channel.
    pub network_channel_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            removal_linger: Duration::from_millis(250),
            network_channel_capacity: 16,
        }
    }
}

/// Errors surfaced by the manager handle.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The manager task already exited.
    #[error("manager task is not running")]
    NotRunning,
    /// The manager task aborted abnormally.
    #[error("manager task failed: {0}")]
    TaskFailed(String),
}

enum ManagerCommand {
    Shutdown,
}

/// Handle to a running manager task.
pub struct ManagerHandle {
    commands: mpsc::Sender<ManagerCommand>,
    task: JoinHandle<()>,
}

impl ManagerHandle {
    /// Stops the manager: every registered session is disconnected before
    /// the task exits and this call returns.
    pub async fn shutdown(self) -> Result<(), ManagerError> {
        self.commands
            .send(ManagerCommand::Shutdown)
            .await
            .map_err(|_| ManagerError::NotRunning)?;
        self.task
            .await
            .map_err(|e| ManagerError::TaskFailed(e.to_string()))
    }

    /// True while the manager task is alive.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Reconciles the cluster store and the catalog, reacts to network
/// transitions, sweeps removed clusters, and resolves inbound requests.
#[derive(Clone)]
pub struct ClusterManager {
    store: Arc<ClusterStore>,
    catalog: Arc<CatalogRegistry>,
    sessions: Arc<SessionMap>,
    config: ManagerConfig,
}

impl ClusterManager {
    /// Creates a manager over the given registries and session map.
    pub fn new(
        store: Arc<ClusterStore>,
        catalog: Arc<CatalogRegistry>,
        sessions: Arc<SessionMap>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            sessions,
            config,
        }
    }

    /// Resolves an inbound request to its owning cluster. See
    /// [`routing::resolve_cluster`] for the rule order.
    pub fn resolve_cluster(&self, request: &mut RouteRequest) -> Option<ClusterRecord> {
        routing::resolve_cluster(&self.store, request)
    }

    /// Runs one immediate store-to-catalog pass, then spawns the manager
    /// loop subscribed to both registries, the removal stream, and the
    /// given network events. Call once per manager.
    pub fn start(&self, network: broadcast::Receiver<NetworkEvent>) -> ManagerHandle {
        let (command_tx, command_rx) = mpsc::channel(4);

        let mut clusters_rx = self.store.subscribe();
        let catalog_rx = self.catalog.subscribe_clusters();
        let removals_rx = self.store.subscribe_removals();

        let clusters = clusters_rx.borrow_and_update().clone();
        reconcile::update_catalog(&clusters, &self.catalog);
        info!(clusters = clusters.len(), "cluster manager started");

        let task = tokio::spawn(self.clone().run(
            command_rx,
            clusters_rx,
            catalog_rx,
            removals_rx,
            network,
        ));

        ManagerHandle {
            commands: command_tx,
            task,
        }
    }

    async fn run(
        self,
        mut commands: mpsc::Receiver<ManagerCommand>,
        mut clusters_rx: watch::Receiver<Vec<ClusterRecord>>,
        mut catalog_rx: watch::Receiver<Vec<KubernetesClusterEntity>>,
        mut removals_rx: watch::Receiver<u64>,
        mut network_rx: broadcast::Receiver<NetworkEvent>,
    ) {
        let mut sweep_deadline: Option<Instant> = None;
        let mut network_open = true;

        // Removals marked before the task started still deserve a sweep.
        if self.store.removed_count() > 0 {
            sweep_deadline = Some(Instant::now() + self.config.removal_linger);
        }

        loop {
            let sweep_at = sweep_deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                result = clusters_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let clusters = clusters_rx.borrow_and_update().clone();
                    reconcile::update_catalog(&clusters, &self.catalog);
                }
                result = catalog_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let entities = catalog_rx.borrow_and_update().clone();
                    reconcile::sync_clusters_from_catalog(&entities, &self.store, &self.catalog);
                }
                result = removals_rx.changed() => {
                    if result.is_err() {
                        break;
                    }
                    removals_rx.borrow_and_update();
                    // Every arrival extends the linger so a burst flushes
                    // as one batch.
                    sweep_deadline = Some(Instant::now() + self.config.removal_linger);
                }
                event = network_rx.recv(), if network_open => {
                    match event {
                        Ok(NetworkEvent::Offline) => self.handle_offline(),
                        Ok(NetworkEvent::Online) => self.handle_online(),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "network event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            network_open = false;
                        }
                    }
                }
                _ = time::sleep_until(sweep_at), if sweep_deadline.is_some() => {
                    sweep_deadline = None;
                    self.sweep_removed().await;
                }
                command = commands.recv() => {
                    match command {
                        Some(ManagerCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        self.disconnect_all().await;
    }

    fn handle_offline(&self) {
        info!("network is offline");
        self.store.update_all(|record| {
            if !record.disconnected {
                record.online = false;
                record.accessible = false;
            }
        });
        self.spawn_probes();
    }

    fn handle_online(&self) {
        info!("network is online");
        self.spawn_probes();
    }

    /// One fire-and-forget probe per non-disconnected cluster. Failures are
    /// logged and dropped; the probe itself records the truth it finds.
    fn spawn_probes(&self) {
        for record in self.store.clusters() {
            if record.disconnected {
                continue;
            }
            if let Some(session) = self.sessions.get(&record.id) {
                let id = record.id.clone();
                tokio::spawn(async move {
                    if let Err(error) = session.refresh_connection_status().await {
                        debug!(cluster = %id, %error, "connectivity probe failed");
                    }
                });
            }
        }
    }

    async fn sweep_removed(&self) {
        let removed = self.store.removed_clusters();
        if removed.is_empty() {
            return;
        }

        let meta: Vec<ClusterMeta> = removed.iter().map(|r| r.meta()).collect();
        info!(count = removed.len(), clusters = ?meta, "removing clusters");

        let mut disconnects = Vec::new();
        for record in &removed {
            if let Some(session) = self.sessions.remove(&record.id) {
                disconnects.push(async move { session.disconnect().await });
            }
        }
        join_all(disconnects).await;

        // Records leave the removed set only once their sessions are down.
        // Anything marked while this batch was in flight keeps waiting for
        // the next sweep.
        let ids: Vec<ClusterId> = removed.iter().map(|r| r.id.clone()).collect();
        self.store.evict_removed(&ids);
    }

    async fn disconnect_all(&self) {
        let sessions = self.sessions.all();
        if !sessions.is_empty() {
            info!(count = sessions.len(), "disconnecting all cluster sessions");
            let disconnects = sessions.into_iter().map(|(id, session)| async move {
                session.disconnect().await;
                debug!(cluster = %id, "session disconnected");
            });
            join_all(disconnects).await;
        }
        info!("cluster manager stopped");
    }
}
