//! SQLite-backed persistent store for domains and servers.
//!
//! This module provides durable storage using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Automatic schema migrations
//! - Deadline-bound statements and units of work
//! - Cascading server deletion with the owning domain
//! - Database-assigned update timestamps

pub mod connection;
pub mod deadline;
pub mod domains;
pub mod migrations;
pub mod queries;
pub mod servers;

pub use connection::Db;
pub use deadline::Deadline;
pub use queries::{Page, Queries};
