//! Entity model: domains, their servers, and point-in-time snapshots.

pub mod domain;
pub mod server;
pub mod snapshot;

pub use domain::Domain;
pub use server::Server;
pub use snapshot::Snapshot;

use crate::Error;

/// Reject an empty required text field.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}
