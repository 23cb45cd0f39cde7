#![warn(missing_docs)]

//! kubedeck manager subsystem: keeps the cluster store and the display
//! catalog in eventual agreement, tracks live connectivity across host
//! network transitions, sweeps removed clusters, and routes inbound proxy
//! requests to the owning cluster.

pub mod cli;
pub mod config;
pub mod manager;
pub mod network;
pub mod reconcile;
pub mod routing;
pub mod session;

pub use config::{AgentConfig, ClusterSeed};
pub use manager::{ClusterManager, ManagerConfig, ManagerError, ManagerHandle};
pub use network::{NetworkEvent, NetworkNotifier};
pub use reconcile::{catalog_entity_from_cluster, sync_clusters_from_catalog, update_catalog};
pub use routing::{
    cluster_id_from_host, resolve_cluster, RouteRequest, API_KUBE_PREFIX, CLUSTER_ID_HEADER,
    LOOPBACK_HOST_PREFIX,
};
pub use session::{ClusterSession, SessionError, SessionMap};
