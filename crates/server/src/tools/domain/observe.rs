//! domain_observe tool implementation.
//!
//! Stores a freshly scanned domain with its servers, derives its grade,
//! previous grade and topology flag, and records it in the recency cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sslwatch_core::{AppConfig, Domain, Reconciler, Server, topology};

use crate::tools::json_result;

/// One server as reported by a scan, in canonical order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObservedServer {
    pub address: String,
    pub ssl_grade: String,
    pub country: String,
    pub owner: String,
}

/// Parameters for the domain_observe tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainObserveParams {
    /// Domain name, e.g. "example.com".
    pub name: String,
    /// Logo URL.
    pub logo: String,
    /// Page title.
    pub title: String,
    /// Whether the domain was unreachable during the scan.
    #[serde(default)]
    pub is_down: bool,
    /// Servers behind the domain; the first one is primary.
    pub servers: Vec<ObservedServer>,
}

/// Output from the domain_observe tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainObserveOutput {
    /// The domain as stored after reconciliation.
    pub domain: Domain,
    /// How many earlier observations of this name were compared against.
    pub prior_observations: usize,
    /// Whether the grade differs from the most recent earlier observation.
    /// False on a first observation.
    pub grade_changed: bool,
}

impl DomainObserveParams {
    fn into_domain(self) -> Result<Domain, sslwatch_core::Error> {
        let mut domain = Domain::new(self.name, self.logo, self.title)?;
        domain.is_down = self.is_down;
        for observed in self.servers {
            let server = Server::new(observed.address, observed.ssl_grade, observed.country, observed.owner, &domain)?;
            domain.push_server(server)?;
        }
        Ok(domain)
    }
}

/// Implementation of the domain_observe tool.
pub async fn observe_impl(
    reconciler: &Reconciler, config: &AppConfig, params: DomainObserveParams,
) -> Result<CallToolResult, McpError> {
    let domain = params.into_domain()?;
    let outcome = reconciler.observe(config.deadline(), &domain).await?;

    let grade_changed = outcome
        .history
        .last()
        .is_some_and(|last| topology::grade_changed(&outcome.updated, last));

    json_result(&DomainObserveOutput {
        prior_observations: outcome.history.len(),
        grade_changed,
        domain: outcome.updated,
    })
}
