//! Domain-related MCP tools.
//!
//! This module provides tools for observing domains and reading back what the
//! store and the recency cache hold.

pub mod delete;
pub mod get;
pub mod list;
pub mod observe;
pub mod recent;

pub use delete::{DomainDeleteParams, delete_impl};
pub use get::{DomainGetParams, get_impl};
pub use list::{DomainListParams, list_impl};
pub use observe::{DomainObserveParams, observe_impl};
pub use recent::recent_impl;
