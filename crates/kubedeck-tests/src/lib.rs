//! kubedeck integration test infrastructure.
//!
//! This crate provides shared test scaffolding for exercising the cluster
//! store, the catalog, and the manager together: a mock cluster session,
//! prebuilt fixtures, and cross-crate integration suites.

pub mod harness;

pub use harness::{init_tracing, ManagerTestBed, MockSession};

#[cfg(test)]
mod manager_integration;
#[cfg(test)]
mod reconcile_integration;
