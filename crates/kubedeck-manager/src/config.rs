use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use kubedeck_store::{ClusterDescriptor, ClusterId, ClusterPreferences, ClusterStore};

use crate::manager::ManagerConfig;

/// Agent-level configuration loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Log filter directive, e.g. `info` or `kubedeck_manager=debug`.
    /// Falls back to the `RUST_LOG` environment variable when unset.
    pub log_filter: Option<String>,
    /// How long the removal sweep waits after the last removal before
    /// flushing, in milliseconds.
    pub removal_linger_ms: u64,
    /// Capacity of the network transition broadcast channel.
    pub network_channel_capacity: usize,
    /// Clusters registered at startup.
    pub clusters: Vec<ClusterSeed>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            removal_linger_ms: 250,
            network_channel_capacity: 16,
            clusters: Vec::new(),
        }
    }
}

/// One cluster entry from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSeed {
    /// Stable cluster id. Generated when omitted.
    pub id: Option<String>,
    /// Path to the kubeconfig file holding the context.
    pub kubeconfig_path: PathBuf,
    /// Context name within the kubeconfig.
    pub context: String,
    /// Display name override.
    pub name: Option<String>,
}

impl AgentConfig {
    /// Loads configuration from a TOML or JSON file, dispatching on the
    /// file extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: AgentConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: AgentConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist. The flag reports whether the fallback was taken
    /// so the caller can log it. A file that exists but fails to parse is
    /// still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<(Self, bool)> {
        if path.exists() {
            Ok((Self::from_file(path)?, false))
        } else {
            Ok((Self::default(), true))
        }
    }

    /// Manager tuning derived from this configuration.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            removal_linger: Duration::from_millis(self.removal_linger_ms),
            network_channel_capacity: self.network_channel_capacity,
        }
    }

    /// Registers every configured cluster with the store and returns the
    /// ids in config order.
    pub fn seed_store(&self, store: &ClusterStore) -> Vec<ClusterId> {
        self.clusters
            .iter()
            .map(|seed| {
                store.add_cluster(ClusterDescriptor {
                    id: seed.id.clone().map(ClusterId::new),
                    kube_config_path: seed.kubeconfig_path.clone(),
                    context_name: seed.context.clone(),
                    preferences: ClusterPreferences {
                        cluster_name: seed.name.clone(),
                        ..ClusterPreferences::default()
                    },
                })
            })
            .collect()
    }
}
