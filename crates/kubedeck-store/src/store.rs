//! Authoritative cluster registry.
//!
//! The store owns the ordered collection of [`ClusterRecord`]s plus the
//! removed-set awaiting the manager's cleanup sweep. All reads hand out
//! snapshots; all writes go through the store so there is exactly one copy
//! of truth. Observers subscribe to a watch channel that only publishes when
//! the snapshot differs by value from the previously published one, so
//! no-op writes never wake a subscriber.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::cluster::{ClusterDescriptor, ClusterId, ClusterRecord};

/// Errors returned by registry mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested cluster id is not in the active collection.
    #[error("cluster not found: {0}")]
    ClusterNotFound(ClusterId),
}

/// Insertion-ordered registry of cluster records.
pub struct ClusterStore {
    clusters: Mutex<Vec<ClusterRecord>>,
    removed: Mutex<Vec<ClusterRecord>>,
    clusters_tx: watch::Sender<Vec<ClusterRecord>>,
    removals_tx: watch::Sender<u64>,
}

impl ClusterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (clusters_tx, _) = watch::channel(Vec::new());
        let (removals_tx, _) = watch::channel(0);
        Self {
            clusters: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            clusters_tx,
            removals_tx,
        }
    }

    /// Adds a cluster, or updates the existing record when the descriptor's
    /// id is already present. Upsert is keyed by id: repeated calls with the
    /// same descriptor leave exactly one record. Returns the record's id,
    /// generated when the descriptor carried none.
    pub fn add_cluster(&self, descriptor: ClusterDescriptor) -> ClusterId {
        let id = descriptor.id.clone().unwrap_or_else(ClusterId::generate);

        let mut clusters = self.clusters.lock().unwrap();
        match clusters.iter_mut().find(|c| c.id == id) {
            Some(existing) => {
                existing.kube_config_path = descriptor.kube_config_path;
                existing.context_name = descriptor.context_name;
                let prefs = descriptor.preferences;
                if prefs.cluster_name.is_some() {
                    existing.preferences.cluster_name = prefs.cluster_name;
                }
                if prefs.prometheus_provider.is_some() {
                    existing.preferences.prometheus_provider = prefs.prometheus_provider;
                }
                if prefs.prometheus_address.is_some() {
                    existing.preferences.prometheus_address = prefs.prometheus_address;
                }
            }
            None => {
                let mut record = ClusterRecord::new(
                    id.clone(),
                    descriptor.kube_config_path,
                    descriptor.context_name,
                );
                record.preferences = descriptor.preferences;
                debug!(cluster = %id, context = %record.context_name, "cluster added");
                clusters.push(record);
            }
        }
        self.publish_locked(&clusters);
        id
    }

    /// Looks up a record by id. A miss is a normal outcome, not an error.
    pub fn get(&self, id: &ClusterId) -> Option<ClusterRecord> {
        let clusters = self.clusters.lock().unwrap();
        clusters.iter().find(|c| &c.id == id).cloned()
    }

    /// Snapshot of the active records in insertion order.
    pub fn clusters(&self) -> Vec<ClusterRecord> {
        self.clusters.lock().unwrap().clone()
    }

    /// Number of active records.
    pub fn len(&self) -> usize {
        self.clusters.lock().unwrap().len()
    }

    /// True when no active records exist.
    pub fn is_empty(&self) -> bool {
        self.clusters.lock().unwrap().is_empty()
    }

    /// Mutates one record in place. Publishes only if the mutation changed
    /// the record by value.
    pub fn update<F>(&self, id: &ClusterId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ClusterRecord),
    {
        let mut clusters = self.clusters.lock().unwrap();
        let record = clusters
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::ClusterNotFound(id.clone()))?;
        f(record);
        self.publish_locked(&clusters);
        Ok(())
    }

    /// Applies a mutation to every active record under one lock, publishing
    /// at most one snapshot for the whole sweep.
    pub fn update_all<F>(&self, mut f: F)
    where
        F: FnMut(&mut ClusterRecord),
    {
        let mut clusters = self.clusters.lock().unwrap();
        for record in clusters.iter_mut() {
            f(record);
        }
        self.publish_locked(&clusters);
    }

    /// Moves a record out of the active collection into the removed set.
    /// The record stays alive there until [`evict_removed`] drops it, which
    /// gives the manager a chance to disconnect its session first.
    ///
    /// [`evict_removed`]: ClusterStore::evict_removed
    pub fn mark_removed(&self, id: &ClusterId) -> Result<(), StoreError> {
        let mut clusters = self.clusters.lock().unwrap();
        let index = clusters
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| StoreError::ClusterNotFound(id.clone()))?;
        let record = clusters.remove(index);
        self.publish_locked(&clusters);
        drop(clusters);

        self.removed.lock().unwrap().push(record);
        self.removals_tx.send_modify(|generation| *generation += 1);
        Ok(())
    }

    /// Snapshot of the records waiting in the removed set.
    pub fn removed_clusters(&self) -> Vec<ClusterRecord> {
        self.removed.lock().unwrap().clone()
    }

    /// Drops the given ids from the removed set in one atomic step. Records
    /// marked while a sweep was still disconnecting are not named in the
    /// sweep's snapshot and survive for the next one.
    pub fn evict_removed(&self, ids: &[ClusterId]) {
        self.removed
            .lock()
            .unwrap()
            .retain(|record| !ids.contains(&record.id));
    }

    /// Number of records waiting in the removed set.
    pub fn removed_count(&self) -> usize {
        self.removed.lock().unwrap().len()
    }

    /// Reactive view of the active records. The receiver sees a new value
    /// only when a write actually changed the snapshot; two value-identical
    /// lists never trigger a recompute.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ClusterRecord>> {
        self.clusters_tx.subscribe()
    }

    /// Notification stream for removed-set arrivals. The value is a
    /// generation counter bumped once per [`mark_removed`]; observers arm
    /// their sweep timer off it instead of polling.
    ///
    /// [`mark_removed`]: ClusterStore::mark_removed
    pub fn subscribe_removals(&self) -> watch::Receiver<u64> {
        self.removals_tx.subscribe()
    }

    fn publish_locked(&self, clusters: &[ClusterRecord]) {
        self.clusters_tx.send_if_modified(|current| {
            if current.as_slice() == clusters {
                return false;
            }
            *current = clusters.to_vec();
            true
        });
    }
}

impl Default for ClusterStore {
    fn default() -> Self {
        Self::new()
    }
}
