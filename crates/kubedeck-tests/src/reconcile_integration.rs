//! Store and catalog reconciliation integration tests.
//!
//! Exercises both reconciliation directions across real registries and
//! checks that repeated passes settle instead of echoing.

use std::path::PathBuf;

use kubedeck_catalog::{
    CatalogEntity, ClusterMetrics, EntityPhase, KubernetesClusterEntity, MetricsSource,
    PrometheusMetrics, WebLinkEntity,
};
use kubedeck_manager::{catalog_entity_from_cluster, sync_clusters_from_catalog, update_catalog};
use kubedeck_store::ClusterId;

use crate::harness::ManagerTestBed;

fn run_round(bed: &ManagerTestBed) {
    update_catalog(&bed.store.clusters(), &bed.catalog);
    sync_clusters_from_catalog(&bed.catalog.kubernetes_clusters(), &bed.store, &bed.catalog);
}

#[test]
fn test_reconciliation_converges_in_one_round() {
    let bed = ManagerTestBed::new();
    bed.add_connected_cluster("c1");
    bed.add_entity("c1");
    bed.add_entity("imported");

    run_round(&bed);

    // Forward direction caught up with the store.
    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);
    assert!(entity.status.active);

    // Reverse direction registered the catalog-only entity.
    assert!(bed.store.get(&ClusterId::new("imported")).is_some());
    assert_eq!(bed.store.len(), 2);

    // A second round changes nothing and publishes nothing.
    let mut store_rx = bed.store.subscribe();
    let mut catalog_rx = bed.catalog.subscribe_clusters();
    run_round(&bed);
    assert!(!store_rx.has_changed().unwrap());
    assert!(!catalog_rx.has_changed().unwrap());
}

#[test]
fn test_repeated_rounds_never_duplicate() {
    let bed = ManagerTestBed::new();
    bed.add_cluster("c1");
    bed.add_entity("c1");
    bed.add_entity("extra");

    for _ in 0..3 {
        run_round(&bed);
    }

    assert_eq!(bed.store.len(), 2);
    assert_eq!(bed.catalog.kubernetes_clusters().len(), 2);
}

#[test]
fn test_user_metrics_choice_survives_rounds() {
    let bed = ManagerTestBed::new();
    let id = bed.add_cluster("c1");
    bed.store
        .update(&id, |r| {
            r.preferences.prometheus_provider = Some("operator".to_string());
            r.preferences.prometheus_address = Some("http://prom:9090".to_string());
        })
        .unwrap();

    let mut entity = KubernetesClusterEntity::new(
        "c1",
        "c1",
        PathBuf::from("/kube/config"),
        "ctx-c1",
    );
    entity.spec.metrics = Some(ClusterMetrics {
        source: MetricsSource::Local,
        prometheus: Some(PrometheusMetrics {
            provider_type: Some("custom".to_string()),
            address: Some("http://stale:9090".to_string()),
        }),
    });
    bed.catalog.add(entity);

    for _ in 0..2 {
        run_round(&bed);
    }

    let entity = bed.catalog.get_cluster("c1").unwrap();
    let metrics = entity.spec.metrics.as_ref().unwrap();
    let prometheus = metrics.prometheus.as_ref().unwrap();

    // The already-chosen provider wins; the address follows preferences.
    assert_eq!(prometheus.provider_type.as_deref(), Some("custom"));
    assert_eq!(prometheus.address.as_deref(), Some("http://prom:9090"));
}

#[test]
fn test_catalog_driven_sync_clears_status_details() {
    let bed = ManagerTestBed::new();
    let id = bed.add_connected_cluster("c1");
    bed.add_entity("c1");
    bed.catalog
        .update_cluster("c1", |e| {
            e.status.reason = Some("token expired".to_string());
            e.status.message = Some("credentials rejected".to_string());
        })
        .unwrap();

    // The store-driven pass only moves phase and active.
    update_catalog(&bed.store.clusters(), &bed.catalog);
    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);
    assert_eq!(entity.status.reason.as_deref(), Some("token expired"));

    // The catalog-driven pass rebuilds the whole status.
    sync_clusters_from_catalog(&bed.catalog.kubernetes_clusters(), &bed.store, &bed.catalog);
    let entity = bed.catalog.get_cluster("c1").unwrap();
    assert_eq!(entity.status.phase, EntityPhase::Connected);
    assert!(entity.status.reason.is_none());
    assert!(entity.status.message.is_none());

    assert!(bed.store.get(&id).is_some());
}

#[test]
fn test_weblink_entities_pass_through_untouched() {
    let bed = ManagerTestBed::new();
    bed.add_cluster("c1");
    bed.add_entity("c1");
    bed.catalog.add(WebLinkEntity::new(
        "link-1",
        "Grafana",
        "https://grafana.internal",
    ));

    for _ in 0..2 {
        run_round(&bed);
    }

    assert_eq!(bed.store.len(), 1);
    assert_eq!(bed.catalog.len(), 2);
    assert!(bed.store.get(&ClusterId::new("link-1")).is_none());
}

#[test]
fn test_entity_from_cluster_feeds_silent_sync() {
    let bed = ManagerTestBed::new();
    let id = bed.add_cluster("c1");
    let record = bed.store.get(&id).unwrap();

    bed.catalog.add(catalog_entity_from_cluster(&record));

    // The derived entity already mirrors the record, so syncing it back
    // rewrites nothing.
    let mut store_rx = bed.store.subscribe();
    sync_clusters_from_catalog(&bed.catalog.kubernetes_clusters(), &bed.store, &bed.catalog);
    assert!(!store_rx.has_changed().unwrap());
    assert_eq!(bed.store.len(), 1);
}

#[test]
fn test_cluster_entity_wire_shape() {
    let entity = KubernetesClusterEntity::new(
        "c1",
        "prod",
        PathBuf::from("/kube/config"),
        "prod-ctx",
    );
    let value = serde_json::to_value(&entity).unwrap();

    assert_eq!(value["metadata"]["uid"], "c1");
    assert_eq!(value["status"]["phase"], "disconnected");

    let mut entity = entity;
    entity.spec.metrics = Some(ClusterMetrics {
        source: MetricsSource::Local,
        prometheus: Some(PrometheusMetrics {
            provider_type: Some("helm".to_string()),
            address: None,
        }),
    });
    let value = serde_json::to_value(&entity).unwrap();
    assert_eq!(value["spec"]["metrics"]["source"], "local");
    assert_eq!(value["spec"]["metrics"]["prometheus"]["type"], "helm");

    let tagged = serde_json::to_value(CatalogEntity::from(entity)).unwrap();
    assert_eq!(tagged["kind"], "KubernetesCluster");
}
