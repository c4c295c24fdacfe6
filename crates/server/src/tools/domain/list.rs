//! domain_list tool implementation.
//!
//! Pages through stored domains in id order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sslwatch_core::{AppConfig, Domain, Page, Reconciler};

use crate::error::ToolError;
use crate::tools::json_result;

const MAX_LIMIT: u32 = 1000;

/// Parameters for the domain_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DomainListParams {
    /// Maximum number of domains to return. Defaults to the configured page size.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Number of domains to skip. Defaults to the configured offset.
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Output from the domain_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainListOutput {
    pub domains: Vec<Domain>,
    /// The page that was actually applied.
    pub page: Page,
}

impl DomainListParams {
    fn page(&self, config: &AppConfig) -> Result<Page, ToolError> {
        let defaults = config.page();
        let page = Page { limit: self.limit.unwrap_or(defaults.limit), offset: self.offset.unwrap_or(defaults.offset) };
        if page.limit == 0 || page.limit > MAX_LIMIT {
            return Err(ToolError::InvalidInput(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok(page)
    }
}

/// Implementation of the domain_list tool.
pub async fn list_impl(
    reconciler: &Reconciler, config: &AppConfig, params: DomainListParams,
) -> Result<CallToolResult, McpError> {
    let page = params.page(config)?;
    let domains = reconciler.db().list_domains(config.deadline(), page).await?;

    json_result(&DomainListOutput { domains, page })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{decode, reconciler};
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_list_uses_configured_page() {
        let (reconciler, config) = reconciler().await;
        for i in 0..7 {
            let domain = Domain::new(format!("d{i}.com"), "logo", "title").unwrap();
            reconciler.db().create_domain(config.deadline(), &domain).await.unwrap();
        }

        let output: DomainListOutput =
            decode(&list_impl(&reconciler, &config, DomainListParams::default()).await.unwrap());
        assert_eq!(output.page, Page { limit: 5, offset: 0 });
        assert_eq!(output.domains.len(), 5);

        let params = DomainListParams { limit: None, offset: Some(5) };
        let output: DomainListOutput = decode(&list_impl(&reconciler, &config, params).await.unwrap());
        assert_eq!(output.domains.len(), 2);
    }

    #[tokio::test]
    async fn test_list_rejects_zero_limit() {
        let (reconciler, config) = reconciler().await;
        let params = DomainListParams { limit: Some(0), offset: None };

        let err = list_impl(&reconciler, &config, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));
    }
}
