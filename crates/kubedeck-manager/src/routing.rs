//! Inbound request routing.
//!
//! Three addressing schemes resolve a request to its owning cluster, tried
//! in order with no fallback past the first applicable rule:
//!
//! 1. loopback host: the first path segment names the cluster, and on a hit
//!    the segment is swapped for the kube-api proxy prefix so the request
//!    can be forwarded in-process;
//! 2. the `x-cluster-id` header names the cluster directly;
//! 3. the second-to-last host label names the cluster
//!    (`<id>.localhost:<port>` style).
//!
//! An unmatched request is a normal outcome, not an error; the HTTP layer
//! turns it into a not-found response.

use std::collections::HashMap;

use kubedeck_store::{ClusterId, ClusterRecord, ClusterStore};

/// Host prefix that selects the loopback addressing rule.
pub const LOOPBACK_HOST_PREFIX: &str = "127.0.0.1";

/// Path prefix substituted for the cluster segment before in-process
/// forwarding to the kube-api proxy.
pub const API_KUBE_PREFIX: &str = "/api-kube";

/// Header naming the target cluster directly.
pub const CLUSTER_ID_HEADER: &str = "x-cluster-id";

/// Inbound request descriptor.
///
/// `path` is mutable because the loopback rule rewrites it in place; the
/// other rules leave the request untouched.
#[derive(Clone, Debug)]
pub struct RouteRequest {
    /// Host header value, which may carry a port.
    pub host: String,
    /// Raw request path.
    pub path: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

impl RouteRequest {
    /// Builds a request with no headers.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header, builder style.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|(key, value)| {
            if key.eq_ignore_ascii_case(name) {
                Some(value.as_str())
            } else {
                None
            }
        })
    }
}

/// Parses the subdomain addressing convention out of a host header:
/// the second-to-last dot-separated label, port ignored.
pub fn cluster_id_from_host(host: &str) -> Option<ClusterId> {
    let name = host.split(':').next().unwrap_or(host);
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let candidate = labels[labels.len() - 2];
    if candidate.is_empty() {
        return None;
    }
    Some(ClusterId::new(candidate))
}

/// Resolves a request to its owning cluster record, or `None` when no rule
/// matches. Only a loopback hit mutates the request, rewriting `path` from
/// `/<id>/...` to `/api-kube/...`.
pub fn resolve_cluster(store: &ClusterStore, request: &mut RouteRequest) -> Option<ClusterRecord> {
    if request.host.starts_with(LOOPBACK_HOST_PREFIX) {
        // Origin-form paths always start with '/'; anything else cannot
        // name a cluster segment.
        let rest = request.path.strip_prefix('/')?;
        let candidate = rest.split('/').next().unwrap_or_default();
        if candidate.is_empty() {
            return None;
        }
        let record = store.get(&ClusterId::new(candidate))?;
        let tail = rest[candidate.len()..].to_string();
        request.path = format!("{}{}", API_KUBE_PREFIX, tail);
        return Some(record);
    }

    if let Some(value) = request.header(CLUSTER_ID_HEADER) {
        return store.get(&ClusterId::new(value));
    }

    let id = cluster_id_from_host(&request.host)?;
    store.get(&id)
}
