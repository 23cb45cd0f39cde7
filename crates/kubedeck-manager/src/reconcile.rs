//! Bidirectional reconciliation between the cluster store and the catalog.
//!
//! The store is authoritative for live state; the catalog is authoritative
//! for kubeconfig location. `update_catalog` pushes derived status into
//! existing entities and never creates one, `sync_clusters_from_catalog`
//! creates or updates records from entities and never deletes one. Each
//! direction writes only the minimal diff, so a pass over unchanged input
//! publishes nothing and the two directions cannot feed each other forever.

use tracing::debug;

use kubedeck_catalog::{
    CatalogRegistry, ClusterMetrics, EntityPhase, EntityStatus, KubernetesClusterEntity,
    MetricsSource, PrometheusMetrics, DISTRO_LABEL,
};
use kubedeck_store::{
    ClusterDescriptor, ClusterId, ClusterPreferences, ClusterRecord, ClusterStore,
};

/// One pass of the store-to-catalog direction.
///
/// For every record with a matching entity: status phase and active are
/// recomputed from the disconnected flag, a non-empty display-name
/// preference overwrites the entity name, and the metrics block is brought
/// up to date. A record without an entity is skipped; creation belongs to
/// the other direction.
pub fn update_catalog(clusters: &[ClusterRecord], catalog: &CatalogRegistry) {
    catalog.update_clusters(|entities| {
        for record in clusters {
            if let Some(entity) = entities
                .iter_mut()
                .find(|e| e.metadata.uid == record.id.as_str())
            {
                apply_record(entity, record);
            }
        }
    });
}

fn apply_record(entity: &mut KubernetesClusterEntity, record: &ClusterRecord) {
    entity.status.phase = if record.disconnected {
        EntityPhase::Disconnected
    } else {
        EntityPhase::Connected
    };
    entity.status.active = !record.disconnected;

    if let Some(name) = record.preferences.cluster_name.as_deref() {
        if !name.is_empty() {
            entity.metadata.name = name.to_string();
        }
    }

    let metrics = entity.spec.metrics.get_or_insert_with(ClusterMetrics::default);

    if metrics.source == MetricsSource::Local {
        let prometheus = metrics.prometheus.get_or_insert_with(PrometheusMetrics::default);

        // A provider type configured on the entity is a user override and
        // survives; the address always mirrors the current preference.
        if prometheus.provider_type.is_none() {
            prometheus.provider_type = record.preferences.prometheus_provider.clone();
        }
        prometheus.address = record.preferences.prometheus_address.clone();
    }
}

/// One pass of the catalog-to-store direction.
///
/// An entity without a record creates one, id and kubeconfig fields copied
/// from the entity and the entity name seeding the display-name preference.
/// An entity with a record pushes the kubeconfig path and context into it
/// and gets its status replaced from the record's current disconnected flag,
/// so a stale phase never survives the pass.
pub fn sync_clusters_from_catalog(
    entities: &[KubernetesClusterEntity],
    store: &ClusterStore,
    catalog: &CatalogRegistry,
) {
    let mut statuses: Vec<(String, bool)> = Vec::new();

    for entity in entities {
        let id = ClusterId::new(entity.metadata.uid.as_str());

        match store.get(&id) {
            None => {
                debug!(cluster = %id, "creating record from catalog entity");
                store.add_cluster(ClusterDescriptor {
                    id: Some(id),
                    kube_config_path: entity.spec.kubeconfig_path.clone(),
                    context_name: entity.spec.kubeconfig_context.clone(),
                    preferences: ClusterPreferences {
                        cluster_name: Some(entity.metadata.name.clone()),
                        ..ClusterPreferences::default()
                    },
                });
            }
            Some(record) => {
                // The record may be swept away between lookup and update.
                let _ = store.update(&id, |r| {
                    r.kube_config_path = entity.spec.kubeconfig_path.clone();
                    r.context_name = entity.spec.kubeconfig_context.clone();
                });
                statuses.push((entity.metadata.uid.clone(), record.disconnected));
            }
        }
    }

    if !statuses.is_empty() {
        catalog.update_clusters(|clusters| {
            for (uid, disconnected) in &statuses {
                if let Some(entity) = clusters.iter_mut().find(|c| &c.metadata.uid == uid) {
                    entity.status = if *disconnected {
                        EntityStatus::disconnected()
                    } else {
                        EntityStatus::connected()
                    };
                }
            }
        });
    }
}

/// Builds a fresh display entity for a store-created cluster, for embedders
/// publishing records into the catalog.
pub fn catalog_entity_from_cluster(record: &ClusterRecord) -> KubernetesClusterEntity {
    let mut entity = KubernetesClusterEntity::new(
        record.id.as_str(),
        record.display_name(),
        record.kube_config_path.clone(),
        record.context_name.as_str(),
    );

    if let Some(distribution) = record.distribution.as_deref() {
        entity
            .metadata
            .labels
            .insert(DISTRO_LABEL.to_string(), distribution.to_string());
    }

    entity.status = if record.disconnected {
        EntityStatus::disconnected()
    } else {
        EntityStatus::connected()
    };

    entity
}
