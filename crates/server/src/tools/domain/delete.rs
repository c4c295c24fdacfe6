//! domain_delete tool implementation.
//!
//! Removes a stored domain; its servers go with it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sslwatch_core::{AppConfig, Reconciler};

use crate::tools::json_result;

/// Parameters for the domain_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainDeleteParams {
    /// Id of the stored domain.
    pub id: String,
}

/// Output from the domain_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainDeleteOutput {
    pub deleted: String,
}

/// Implementation of the domain_delete tool.
pub async fn delete_impl(
    reconciler: &Reconciler, config: &AppConfig, params: DomainDeleteParams,
) -> Result<CallToolResult, McpError> {
    reconciler.db().delete_domain(config.deadline(), &params.id).await?;
    tracing::info!(domain_id = %params.id, "deleted domain");

    json_result(&DomainDeleteOutput { deleted: params.id })
}
