//! Page quality review
//!
//! Fetches a page with everything the rules look at and hands it to the analysis engine in
//! the core crate. Ancestors come back with the page, so depth needs no extra round trip.

use super::client::{ConfluenceClient, GatewayResult};
use super::read::PAGE_EXPAND;
use confluence_mcp_core::analysis::{analyze, AnalysisReport};
use confluence_mcp_core::suggestions::{generate_suggestions, SuggestionReport};

impl ConfluenceClient {
    pub async fn analyze_page(&self, page_id: &str) -> GatewayResult<AnalysisReport> {
        let page = self.get_page(page_id, Some(PAGE_EXPAND)).await?;
        let report = analyze(&page);

        log::debug!(
            "analyzed page {page_id}: {} finding(s)",
            report.summary.total
        );
        Ok(report)
    }

    pub async fn suggest_improvements(&self, page_id: &str) -> GatewayResult<SuggestionReport> {
        let report = self.analyze_page(page_id).await?;
        Ok(generate_suggestions(&report))
    }
}

#[cfg(test)]
mod tests {
    use crate::atlassian::confluence::testing::{MockServer, Stub};
    use confluence_mcp_core::analysis::{Category, Severity};
    use serde_json::json;

    fn neglected_page() -> serde_json::Value {
        json!({
            "id": "77",
            "type": "page",
            "status": "current",
            "title": "TEST PAGE HERE",
            "space": { "key": "OPS" },
            "version": { "number": 2, "when": "2001-01-01T00:00:00.000Z" },
            "body": { "storage": { "value": "" } },
            "ancestors": [ { "id": "1" }, { "id": "2" }, { "id": "3" }, { "id": "4" }, { "id": "5" } ],
            "metadata": { "labels": { "results": [] } }
        })
    }

    #[tokio::test]
    async fn test_analyze_page_fetches_full_expansion() {
        let server =
            MockServer::start(vec![Stub::get("/wiki/rest/api/content/77", neglected_page())]).await;

        let report = server.client().analyze_page("77").await.unwrap();

        let expand = server.requests()[0].query_param("expand").unwrap();
        assert!(expand.contains("body.storage"));
        assert!(expand.contains("ancestors"));
        assert_eq!(report.page_id, "77");

        let structure: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.category == Category::Structure)
            .collect();
        assert_eq!(structure.len(), 1);
        assert_eq!(structure[0].severity, Severity::Error);
        assert!(report
            .findings
            .iter()
            .any(|f| f.category == Category::Nesting));
    }

    #[tokio::test]
    async fn test_suggest_improvements_keeps_finding_messages() {
        let server =
            MockServer::start(vec![Stub::get("/wiki/rest/api/content/77", neglected_page())]).await;
        let client = server.client();

        let analysis = client.analyze_page("77").await.unwrap();
        let suggestions = client.suggest_improvements("77").await.unwrap();

        let findings: Vec<_> = analysis.findings.iter().map(|f| f.message.clone()).collect();
        let originating: Vec<_> = suggestions
            .suggestions
            .iter()
            .map(|s| s.finding.clone())
            .collect();
        assert_eq!(findings, originating);
        assert!(suggestions
            .priority_actions
            .contains(&"Page has no content".to_string()));
    }
}
