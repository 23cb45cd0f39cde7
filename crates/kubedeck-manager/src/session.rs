//! Cluster session contract and the shared session map.
//!
//! A session is the live connection object for one cluster. Its transport
//! internals are owned by the embedding application; the manager only drives
//! the narrow lifecycle surface below. Probe results land in the cluster
//! store's live flags, which stays the single copy of truth.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use kubedeck_store::ClusterId;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connectivity probe could not reach the cluster.
    #[error("connectivity probe failed: {0}")]
    ProbeFailed(String),
}

/// Lifecycle surface of one live cluster connection.
///
/// `disconnect` is idempotent and infallible; callers may invoke it on an
/// already-disconnected session. `refresh_connection_status` re-probes the
/// cluster and records the outcome in the store's live flags before
/// returning.
#[async_trait]
pub trait ClusterSession: Send + Sync {
    /// Tears down the live connection.
    async fn disconnect(&self);

    /// Re-runs the connectivity probe.
    async fn refresh_connection_status(&self) -> Result<(), SessionError>;
}

/// Concurrent registry of sessions keyed by cluster id.
pub struct SessionMap {
    sessions: DashMap<ClusterId, Arc<dyn ClusterSession>>,
}

impl SessionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a session for a cluster, replacing any previous one.
    pub fn register(&self, id: ClusterId, session: Arc<dyn ClusterSession>) {
        self.sessions.insert(id, session);
    }

    /// Removes and returns the session for a cluster.
    pub fn remove(&self, id: &ClusterId) -> Option<Arc<dyn ClusterSession>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Looks up the session for a cluster.
    pub fn get(&self, id: &ClusterId) -> Option<Arc<dyn ClusterSession>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every registered session.
    pub fn all(&self) -> Vec<(ClusterId, Arc<dyn ClusterSession>)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}
