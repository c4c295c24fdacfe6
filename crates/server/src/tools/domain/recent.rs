//! domain_recent tool implementation.
//!
//! Lists the most recent cached observation of every domain name.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sslwatch_core::{Domain, Reconciler};

use crate::tools::json_result;

/// Output from the domain_recent tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainRecentOutput {
    /// One domain per name, ordered by when it was last observed.
    pub domains: Vec<Domain>,
}

/// Implementation of the domain_recent tool.
pub async fn recent_impl(reconciler: &Reconciler) -> Result<CallToolResult, McpError> {
    json_result(&DomainRecentOutput { domains: reconciler.recent_domains() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{decode, reconciler};

    fn observed(name: &str, grade: &str) -> Domain {
        let mut domain = Domain::new(name, "logo", "title").unwrap();
        domain.ssl_grade = Some(grade.into());
        domain
    }

    #[tokio::test]
    async fn test_recent_empty() {
        let (reconciler, _) = reconciler().await;
        let output: DomainRecentOutput = decode(&recent_impl(&reconciler).await.unwrap());
        assert!(output.domains.is_empty());
    }

    #[tokio::test]
    async fn test_recent_keeps_latest_per_name() {
        let (reconciler, _) = reconciler().await;
        reconciler.record(&observed("example.com", "C")).unwrap();
        reconciler.record(&observed("other.com", "A")).unwrap();
        reconciler.record(&observed("example.com", "B")).unwrap();

        let output: DomainRecentOutput = decode(&recent_impl(&reconciler).await.unwrap());
        let names: Vec<_> = output.domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["other.com", "example.com"]);
        assert_eq!(output.domains[1].ssl_grade.as_deref(), Some("B"));
    }
}
