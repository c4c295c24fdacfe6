use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Domain, require};
use crate::Error;

/// One network endpoint behind a domain, with its own observed grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Server {
    pub id: String,
    pub domain_id: String,
    pub address: String,
    pub ssl_grade: String,
    pub country: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Server {
    /// Create a server owned by `domain`.
    pub fn new(
        address: impl Into<String>, ssl_grade: impl Into<String>, country: impl Into<String>,
        owner: impl Into<String>, domain: &Domain,
    ) -> Result<Self, Error> {
        let (address, ssl_grade, country, owner) = (address.into(), ssl_grade.into(), country.into(), owner.into());
        require("address", &address)?;
        require("ssl grade", &ssl_grade)?;
        require("country", &country)?;
        require("owner", &owner)?;
        if domain.id.is_empty() {
            return Err(Error::EmptyDomainIdentifier);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            domain_id: domain.id.clone(),
            address,
            ssl_grade,
            country,
            owner,
            created_at: now,
            updated_at: now,
        })
    }
}
