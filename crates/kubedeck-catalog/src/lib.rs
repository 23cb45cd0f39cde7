#![warn(missing_docs)]

//! kubedeck catalog subsystem: the display-oriented entity registry. Entities
//! mirror cluster state for presentation layers but are owned and updated
//! independently of the cluster store.

pub mod entity;
pub mod registry;

pub use entity::{
    CatalogEntity, ClusterMetrics, EntityKind, EntityMetadata, EntityPhase, EntityStatus,
    KubernetesClusterEntity, KubernetesClusterSpec, MetricsSource, PrometheusMetrics,
    WebLinkEntity, DISTRO_LABEL,
};
pub use registry::{CatalogError, CatalogRegistry};
