//! Cluster record model.
//!
//! A [`ClusterRecord`] is the authoritative configuration and live-state entry
//! for one managed cluster. Records live in the [`ClusterStore`] and are the
//! single copy of truth for the `disconnected`/`online`/`accessible` flags;
//! the display catalog carries a derived view, never a second copy.
//!
//! [`ClusterStore`]: crate::store::ClusterStore

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a managed cluster.
///
/// Derived from the kube-context at import time or assigned externally as a
/// UID. Identity never changes for the lifetime of the record; the display
/// catalog links entities to records through this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    /// Creates an id from an existing string identity.
    pub fn new(id: impl Into<String>) -> Self {
        ClusterId(id.into())
    }

    /// Generates a fresh random id for clusters that arrive without one.
    pub fn generate() -> Self {
        ClusterId(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClusterId {
    fn from(id: String) -> Self {
        ClusterId(id)
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        ClusterId(id.to_string())
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-tunable preferences attached to a cluster record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPreferences {
    /// Display name override. Empty or absent means "use the context name".
    pub cluster_name: Option<String>,
    /// Metrics-provider hint, e.g. `"operator"` or `"helm"`. Seeds the
    /// catalog entity's prometheus type once, never overwriting a value the
    /// user already configured there.
    pub prometheus_provider: Option<String>,
    /// Prometheus service address. Mirrored into the catalog entity on every
    /// reconciliation pass.
    pub prometheus_address: Option<String>,
}

/// The authoritative record for one managed cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Stable identity, see [`ClusterId`].
    pub id: ClusterId,
    /// Path to the kubeconfig file holding this cluster's context.
    pub kube_config_path: PathBuf,
    /// Context name within the kubeconfig file.
    pub context_name: String,
    /// User preferences.
    pub preferences: ClusterPreferences,
    /// Detected distribution label, e.g. `"k3s"` or `"eks"`, when known.
    pub distribution: Option<String>,
    /// True while no live session is established. New records start
    /// disconnected.
    pub disconnected: bool,
    /// Last probe verdict: the API endpoint answered.
    pub online: bool,
    /// Last probe verdict: the API endpoint answered an authenticated call.
    pub accessible: bool,
}

impl ClusterRecord {
    /// Creates a record in the initial disconnected state.
    pub fn new(id: ClusterId, kube_config_path: PathBuf, context_name: impl Into<String>) -> Self {
        Self {
            id,
            kube_config_path,
            context_name: context_name.into(),
            preferences: ClusterPreferences::default(),
            distribution: None,
            disconnected: true,
            online: false,
            accessible: false,
        }
    }

    /// The name shown to users: the preference override when set and
    /// non-empty, the context name otherwise.
    pub fn display_name(&self) -> &str {
        match self.preferences.cluster_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.context_name,
        }
    }

    /// Compact identity used when logging batches of records.
    pub fn meta(&self) -> ClusterMeta {
        ClusterMeta {
            id: self.id.clone(),
            name: self.display_name().to_string(),
        }
    }
}

/// Compact record identity for log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMeta {
    /// Record id.
    pub id: ClusterId,
    /// Display name at the time the meta was taken.
    pub name: String,
}

/// Input to [`ClusterStore::add_cluster`].
///
/// A descriptor without an id gets a generated one; a descriptor whose id
/// matches an existing record updates that record in place instead of
/// creating a duplicate.
///
/// [`ClusterStore::add_cluster`]: crate::store::ClusterStore::add_cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    /// Identity to create or update. Generated when absent.
    pub id: Option<ClusterId>,
    /// Path to the kubeconfig file.
    pub kube_config_path: PathBuf,
    /// Context name within the kubeconfig file.
    pub context_name: String,
    /// Initial preferences. On update, only the fields set here overwrite
    /// the record's existing preferences.
    pub preferences: ClusterPreferences,
}
