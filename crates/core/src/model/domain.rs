//! The domain aggregate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Server, require};
use crate::Error;

/// An internet domain and the servers observed behind it.
///
/// `servers` is ordered: index 0 is the primary server whose grade becomes
/// the domain grade, and topology comparison is positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub server_changed: bool,
    pub ssl_grade: Option<String>,
    pub previous_ssl_grade: Option<String>,
    pub logo: String,
    pub title: String,
    pub is_down: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// Create a domain for its first observation.
    ///
    /// Name, logo and title are required; grades start empty.
    pub fn new(name: impl Into<String>, logo: impl Into<String>, title: impl Into<String>) -> Result<Self, Error> {
        let (name, logo, title) = (name.into(), logo.into(), title.into());
        require("domain name", &name)?;
        require("logo", &logo)?;
        require("title", &title)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            servers: Vec::new(),
            server_changed: false,
            ssl_grade: None,
            previous_ssl_grade: None,
            logo,
            title,
            is_down: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Append a server at the end of the canonical order.
    pub fn push_server(&mut self, server: Server) -> Result<(), Error> {
        if server.domain_id != self.id {
            return Err(Error::InvalidInput(format!(
                "server {} belongs to domain {}, not {}",
                server.id, server.domain_id, self.id
            )));
        }
        self.servers.push(server);
        Ok(())
    }

    /// Builder-style variant of [`Domain::push_server`].
    pub fn with_server(mut self, server: Server) -> Result<Self, Error> {
        self.push_server(server)?;
        Ok(self)
    }

    /// The canonical (index 0) server, if any.
    pub fn primary_server(&self) -> Option<&Server> {
        self.servers.first()
    }
}
