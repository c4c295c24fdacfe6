//! Unified error types for sslwatch.
//!
//! Every variant renders as `CODE: detail` so the boundary can surface a
//! stable code without matching on message text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the store, the recency cache and the reconciler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model value failed validation (e.g., empty address).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A lookup or write was attempted with an empty identifier.
    #[error("EMPTY_IDENTIFIER: {0} cannot be empty")]
    EmptyIdentifier(&'static str),

    /// The recency cache was handed a domain without a name.
    #[error("EMPTY_DOMAIN: domain name cannot be empty")]
    EmptyDomain,

    /// A reconciliation was requested for a domain without an id.
    #[error("EMPTY_DOMAIN_IDENTIFIER: domain id cannot be empty")]
    EmptyDomainIdentifier,

    /// A domain carries (or was stored with) no servers.
    #[error("EMPTY_SERVER_SET: domain {0} has no servers")]
    EmptyServerSet(String),

    /// An update or delete matched zero rows, or a required row is missing.
    #[error("NO_SUCH_RECORD: {0}")]
    NoSuchRecord(String),

    /// Statement execution or transaction control failed.
    #[error("QUERY_FAILED: {0}")]
    QueryFailed(tokio_rusqlite::Error),

    /// A row could not be decoded into a model value.
    #[error("DECODE_FAILED: {0}")]
    DecodeFailed(String),

    /// The caller's deadline passed before the work finished.
    #[error("DEADLINE_EXCEEDED: operation did not finish before its deadline")]
    DeadlineExceeded,

    /// Migration failed to apply.
    #[error("MIGRATION_FAILED: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this error was raised by input validation rather than I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::EmptyIdentifier(_)
                | Error::EmptyDomain
                | Error::EmptyDomainIdentifier
                | Error::EmptyServerSet(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::QueryFailed(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::QueryFailed(tokio_rusqlite::Error::Close(c)),
            _ => Error::QueryFailed(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            other => Error::QueryFailed(other),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Error::DecodeFailed(err.to_string()),
            other => Error::QueryFailed(tokio_rusqlite::Error::Error(other)),
        }
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        if err.is_validation() {
            tracing::debug!(error = %err, "rejected invalid request");
        } else {
            tracing::warn!(error = %err, "request failed");
        }

        let code = match &err {
            Error::InvalidInput(_)
            | Error::EmptyIdentifier(_)
            | Error::EmptyDomain
            | Error::EmptyDomainIdentifier
            | Error::EmptyServerSet(_) => -32602,
            Error::NoSuchRecord(_) => -32001,
            Error::QueryFailed(_) | Error::MigrationFailed(_) => -32002,
            Error::DecodeFailed(_) => -32003,
            Error::DeadlineExceeded => -32004,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
