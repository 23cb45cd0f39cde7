//! Catalog entity model. Two kinds exist: Kubernetes clusters, which the
//! manager reconciles against the cluster store, and web links, which it
//! leaves alone.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Label key carrying the cluster's Kubernetes distribution.
pub const DISTRO_LABEL: &str = "distro";

/// Connection phase surfaced on a cluster entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityPhase {
    /// The cluster session is established.
    Connected,
    /// No live session for the cluster.
    Disconnected,
}

impl fmt::Display for EntityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityPhase::Connected => write!(f, "connected"),
            EntityPhase::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Display status of a cluster entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatus {
    /// Current connection phase.
    pub phase: EntityPhase,
    /// Whether the entity is active (the negation of disconnected).
    pub active: bool,
    /// Short machine-readable cause, set by external status writers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable detail accompanying the reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EntityStatus {
    /// Status for an entity whose cluster session is established. Any
    /// previously recorded reason and message are cleared.
    pub fn connected() -> Self {
        Self {
            phase: EntityPhase::Connected,
            active: true,
            reason: None,
            message: None,
        }
    }

    /// Status for an entity with no live session. Any previously recorded
    /// reason and message are cleared.
    pub fn disconnected() -> Self {
        Self {
            phase: EntityPhase::Disconnected,
            active: false,
            reason: None,
            message: None,
        }
    }
}

impl Default for EntityStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Where cluster metrics are scraped from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    /// Metrics come from a Prometheus instance the app manages.
    Local,
    /// Metrics come from an externally operated endpoint.
    External,
}

/// Prometheus scrape settings carried on a cluster entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrometheusMetrics {
    /// Provider flavor, e.g. an operator or helm install. User overrides
    /// survive reconciliation once set.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    /// Query endpoint address, refreshed from cluster preferences on every
    /// reconciliation pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Metrics configuration block on a cluster entity spec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Scrape source.
    pub source: MetricsSource,
    /// Prometheus settings, present whenever the source is local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusMetrics>,
}

impl Default for ClusterMetrics {
    fn default() -> Self {
        Self {
            source: MetricsSource::Local,
            prometheus: None,
        }
    }
}

/// Identity block shared by every entity kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Stable identifier; for cluster entities it equals the cluster
    /// record's id.
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Origin of the entity, e.g. `local` for app-created entries.
    pub source: String,
    /// Free-form labels shown by presentation layers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Spec block of a Kubernetes-cluster entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesClusterSpec {
    /// Path to the kubeconfig file holding the cluster's context.
    pub kubeconfig_path: PathBuf,
    /// Context name inside the kubeconfig file.
    pub kubeconfig_context: String,
    /// Metrics configuration; populated by reconciliation when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ClusterMetrics>,
}

/// Catalog entity representing one managed Kubernetes cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesClusterEntity {
    /// Identity and labels.
    pub metadata: EntityMetadata,
    /// Kubeconfig and metrics settings.
    pub spec: KubernetesClusterSpec,
    /// Live connection status.
    pub status: EntityStatus,
}

impl KubernetesClusterEntity {
    /// Builds a locally sourced entity in the disconnected state.
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        kubeconfig_path: PathBuf,
        kubeconfig_context: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EntityMetadata {
                uid: uid.into(),
                name: name.into(),
                source: "local".to_string(),
                labels: BTreeMap::new(),
            },
            spec: KubernetesClusterSpec {
                kubeconfig_path,
                kubeconfig_context: kubeconfig_context.into(),
                metrics: None,
            },
            status: EntityStatus::disconnected(),
        }
    }
}

/// Catalog entity pointing at an external URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebLinkEntity {
    /// Identity and labels.
    pub metadata: EntityMetadata,
    /// Link target.
    pub url: String,
}

impl WebLinkEntity {
    /// Builds a locally sourced web link.
    pub fn new(uid: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            metadata: EntityMetadata {
                uid: uid.into(),
                name: name.into(),
                source: "local".to_string(),
                labels: BTreeMap::new(),
            },
            url: url.into(),
        }
    }
}

/// Entity kind discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A managed Kubernetes cluster.
    KubernetesCluster,
    /// An external link.
    WebLink,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::KubernetesCluster => write!(f, "KubernetesCluster"),
            EntityKind::WebLink => write!(f, "WebLink"),
        }
    }
}

/// Any entity the catalog can hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CatalogEntity {
    /// A managed Kubernetes cluster.
    KubernetesCluster(KubernetesClusterEntity),
    /// An external link.
    WebLink(WebLinkEntity),
}

impl CatalogEntity {
    /// The entity's stable identifier.
    pub fn uid(&self) -> &str {
        match self {
            CatalogEntity::KubernetesCluster(c) => &c.metadata.uid,
            CatalogEntity::WebLink(w) => &w.metadata.uid,
        }
    }

    /// The entity's display name.
    pub fn name(&self) -> &str {
        match self {
            CatalogEntity::KubernetesCluster(c) => &c.metadata.name,
            CatalogEntity::WebLink(w) => &w.metadata.name,
        }
    }

    /// The entity's kind discriminant.
    pub fn kind(&self) -> EntityKind {
        match self {
            CatalogEntity::KubernetesCluster(_) => EntityKind::KubernetesCluster,
            CatalogEntity::WebLink(_) => EntityKind::WebLink,
        }
    }
}

impl From<KubernetesClusterEntity> for CatalogEntity {
    fn from(entity: KubernetesClusterEntity) -> Self {
        CatalogEntity::KubernetesCluster(entity)
    }
}

impl From<WebLinkEntity> for CatalogEntity {
    fn from(entity: WebLinkEntity) -> Self {
        CatalogEntity::WebLink(entity)
    }
}
