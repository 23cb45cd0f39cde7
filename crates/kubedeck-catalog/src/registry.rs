//! Ordered entity registry with a kind-filtered reactive view.
//!
//! Entities are stored in insertion order and mutated in place; the registry
//! never deletes entities on behalf of the reconciliation layer. Observers of
//! the Kubernetes-cluster view are woken only when that filtered view changes
//! by value, so status writes that do not alter anything stay silent.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::entity::{CatalogEntity, KubernetesClusterEntity};

/// Errors returned by registry mutations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No entity with the requested uid exists.
    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

/// Insertion-ordered collection of catalog entities.
pub struct CatalogRegistry {
    entities: Mutex<Vec<CatalogEntity>>,
    clusters_tx: watch::Sender<Vec<KubernetesClusterEntity>>,
}

impl CatalogRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        let (clusters_tx, _) = watch::channel(Vec::new());
        Self {
            entities: Mutex::new(Vec::new()),
            clusters_tx,
        }
    }

    /// Adds an entity, replacing any existing entity with the same uid at
    /// its current position.
    pub fn add(&self, entity: impl Into<CatalogEntity>) {
        let entity = entity.into();
        let mut entities = self.entities.lock().unwrap();
        match entities.iter().position(|e| e.uid() == entity.uid()) {
            Some(index) => entities[index] = entity,
            None => {
                debug!(uid = entity.uid(), kind = %entity.kind(), "entity added");
                entities.push(entity);
            }
        }
        self.publish_locked(&entities);
    }

    /// Snapshot of every entity in insertion order.
    pub fn entities(&self) -> Vec<CatalogEntity> {
        self.entities.lock().unwrap().clone()
    }

    /// Snapshot of the Kubernetes-cluster entities only, in insertion order.
    pub fn kubernetes_clusters(&self) -> Vec<KubernetesClusterEntity> {
        let entities = self.entities.lock().unwrap();
        Self::filter_clusters(&entities)
    }

    /// Looks up a Kubernetes-cluster entity by uid.
    pub fn get_cluster(&self, uid: &str) -> Option<KubernetesClusterEntity> {
        self.kubernetes_clusters()
            .into_iter()
            .find(|c| c.metadata.uid == uid)
    }

    /// Number of entities of any kind.
    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    /// True when the registry holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.lock().unwrap().is_empty()
    }

    /// Mutates one Kubernetes-cluster entity in place.
    pub fn update_cluster<F>(&self, uid: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut KubernetesClusterEntity),
    {
        let mut entities = self.entities.lock().unwrap();
        let cluster = entities
            .iter_mut()
            .find_map(|e| match e {
                CatalogEntity::KubernetesCluster(c) if c.metadata.uid == uid => Some(c),
                _ => None,
            })
            .ok_or_else(|| CatalogError::EntityNotFound(uid.to_string()))?;
        f(cluster);
        self.publish_locked(&entities);
        Ok(())
    }

    /// Runs one batched mutation over all Kubernetes-cluster entities. Each
    /// entity keeps its position; subscribers observe a single coherent
    /// change for the whole batch, or none when the batch was a no-op.
    pub fn update_clusters<F>(&self, f: F)
    where
        F: FnOnce(&mut [&mut KubernetesClusterEntity]),
    {
        let mut entities = self.entities.lock().unwrap();
        let mut clusters: Vec<&mut KubernetesClusterEntity> = entities
            .iter_mut()
            .filter_map(|e| match e {
                CatalogEntity::KubernetesCluster(c) => Some(c),
                _ => None,
            })
            .collect();
        f(&mut clusters);
        self.publish_locked(&entities);
    }

    /// Reactive view of the Kubernetes-cluster entities. Publishes only on
    /// value-level change of the filtered list.
    pub fn subscribe_clusters(&self) -> watch::Receiver<Vec<KubernetesClusterEntity>> {
        self.clusters_tx.subscribe()
    }

    fn filter_clusters(entities: &[CatalogEntity]) -> Vec<KubernetesClusterEntity> {
        entities
            .iter()
            .filter_map(|e| match e {
                CatalogEntity::KubernetesCluster(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    fn publish_locked(&self, entities: &[CatalogEntity]) {
        let clusters = Self::filter_clusters(entities);
        self.clusters_tx.send_if_modified(|current| {
            if *current == clusters {
                return false;
            }
            *current = clusters;
            true
        });
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}
