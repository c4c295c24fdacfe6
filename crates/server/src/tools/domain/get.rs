//! domain_get tool implementation.
//!
//! Retrieves one stored domain with its servers by id.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sslwatch_core::{AppConfig, Domain, Error, Reconciler};

use crate::tools::json_result;

/// Parameters for the domain_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainGetParams {
    /// Id of the stored domain.
    pub id: String,
}

/// Output from the domain_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainGetOutput {
    pub domain: Domain,
}

/// Implementation of the domain_get tool.
pub async fn get_impl(
    reconciler: &Reconciler, config: &AppConfig, params: DomainGetParams,
) -> Result<CallToolResult, McpError> {
    let domain = reconciler
        .db()
        .get_domain_with_servers(config.deadline(), &params.id)
        .await?
        .ok_or_else(|| Error::NoSuchRecord(format!("domain {}", params.id)))?;

    json_result(&DomainGetOutput { domain })
}
