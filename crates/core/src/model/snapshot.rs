//! Point-in-time observations of a domain.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Domain;
use crate::Error;

/// An immutable copy of a domain (servers included) as it was observed.
///
/// The snapshot owns its copy, so later changes to the live domain never
/// leak into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub seq: u64,
    pub domain: Domain,
    pub domain_name: String,
    pub ssl_grade: Option<String>,
    pub server_changed: bool,
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn new(seq: u64, domain: &Domain) -> Result<Self, Error> {
        if domain.name.is_empty() {
            return Err(Error::EmptyDomain);
        }

        Ok(Self {
            seq,
            domain: domain.clone(),
            domain_name: domain.name.clone(),
            ssl_grade: domain.ssl_grade.clone(),
            server_changed: domain.server_changed,
            observed_at: Utc::now(),
        })
    }

    /// Cache key in the `{seq}.{domain_name}` layout.
    pub fn key(&self) -> String {
        format!("{}.{}", self.seq, self.domain_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let domain = Domain::new("example.com", "logo", "title").unwrap();
        let snapshot = Snapshot::new(7, &domain).unwrap();
        assert_eq!(snapshot.key(), "7.example.com");
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut domain = Domain::new("example.com", "logo", "title").unwrap();
        domain.ssl_grade = Some("B".into());
        let snapshot = Snapshot::new(1, &domain).unwrap();

        domain.ssl_grade = Some("A".into());
        assert_eq!(snapshot.ssl_grade.as_deref(), Some("B"));
        assert_eq!(snapshot.domain.ssl_grade.as_deref(), Some("B"));
    }

    #[test]
    fn test_snapshot_requires_name() {
        let mut domain = Domain::new("example.com", "logo", "title").unwrap();
        domain.name.clear();
        assert!(matches!(Snapshot::new(1, &domain), Err(Error::EmptyDomain)));
    }
}
