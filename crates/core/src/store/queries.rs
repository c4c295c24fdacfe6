//! Statement-level access to the store.

use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite::Connection;

use super::Deadline;
use crate::Error;

/// SQL expression for the database clock, in the same layout as stored timestamps.
pub(crate) const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Limit/offset bounds for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 5, offset: 0 }
    }
}

/// Query capability scoped to one connection borrow.
///
/// Inside [`Db::with_transaction`](super::Db::with_transaction) it is bound
/// to the open transaction and cannot outlive it. Every statement checks the
/// deadline before it executes.
pub struct Queries<'a> {
    conn: &'a Connection,
    deadline: Deadline,
}

impl<'a> Queries<'a> {
    pub(crate) fn new(conn: &'a Connection, deadline: Deadline) -> Self {
        Self { conn, deadline }
    }

    /// Borrow the connection for one statement, or fail if out of time.
    pub(crate) fn conn(&self) -> Result<&'a Connection, Error> {
        self.deadline.check()?;
        Ok(self.conn)
    }
}

pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(column: &'static str, raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::DecodeFailed(format!("{column} {raw:?}: {e}")))
}
