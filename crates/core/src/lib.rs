//! Core types and shared functionality for sslwatch.
//!
//! This crate provides:
//! - Domain and server records with a SQLite store
//! - An in-memory recency cache of domain snapshots
//! - Topology change detection and grade reconciliation
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod model;
pub mod recency;
pub mod reconcile;
pub mod store;
pub mod topology;

pub use config::AppConfig;
pub use error::Error;
pub use model::{Domain, Server, Snapshot};
pub use recency::RecencyCache;
pub use reconcile::{Reconciler, Reconciliation};
pub use store::{Db, Deadline, Page};
pub use topology::TopologyPolicy;
