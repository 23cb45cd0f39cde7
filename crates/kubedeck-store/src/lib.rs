#![warn(missing_docs)]

//! kubedeck store subsystem: the authoritative registry of managed Kubernetes
//! clusters. Owns the single copy of each cluster record, its live-session
//! flags, and the removed-set drained by the manager's cleanup sweep.

pub mod cluster;
pub mod store;

pub use cluster::{
    ClusterDescriptor, ClusterId, ClusterMeta, ClusterPreferences, ClusterRecord,
};
pub use store::{ClusterStore, StoreError};
