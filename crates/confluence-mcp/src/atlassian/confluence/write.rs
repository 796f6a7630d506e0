//! Write operations: create, update, labels and archive
//!
//! Updates and archives read the current version first and send `version + 1`; the server
//! rejects stale versions, which surfaces as [`Error::VersionConflict`]. Every operation accepts
//! `dry_run`, in which case the payload is returned instead of sent.

use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

use super::client::{decode, ConfluenceClient, GatewayResult, WriteOutcome};
use super::read::{decode_content, METADATA_EXPAND};
use crate::error::Error;
use confluence_mcp_core::confluence::normalize::{normalize_labels, normalize_page};
use confluence_mcp_core::confluence::payload::{
    build_archive_payload, build_create_payload, build_labels_payload, build_update_payload,
    dry_run, PageUpdate, WriteAction,
};
use confluence_mcp_core::confluence::types::LabelListResponse;
use confluence_mcp_core::confluence::PageRecord;

/// Labels on a page after an add
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelsOutput {
    pub page_id: String,
    pub labels: Vec<String>,
}

/// Outcome of removing a single label
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabelRemoval {
    pub label: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelRemovalOutput {
    pub page_id: String,
    pub results: Vec<LabelRemoval>,
    pub partial_failure: bool,
}

fn content_endpoint(page_id: &str) -> String {
    format!("/content/{}", urlencoding::encode(page_id))
}

fn with_page_id(mut preview: Value, page_id: &str) -> Value {
    if let Some(fields) = preview.as_object_mut() {
        fields.insert("pageId".to_string(), json!(page_id));
    }
    preview
}

impl ConfluenceClient {
    fn page_from_response(&self, value: Value) -> GatewayResult<PageRecord> {
        Ok(normalize_page(decode_content(value)?, self.base_url()))
    }

    /// Page metadata for a versioned write; the server must report a version number
    async fn current_page(&self, page_id: &str) -> GatewayResult<PageRecord> {
        let query = [("expand", METADATA_EXPAND.to_string())];
        let content = decode_content(self.get(&content_endpoint(page_id), &query).await?)?;

        if content.version.as_ref().and_then(|v| v.number).is_none() {
            return Err(Error::Serialization(format!(
                "page {page_id} has no version number"
            )));
        }

        Ok(normalize_page(content, self.base_url()))
    }

    pub async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
        dry_run: bool,
    ) -> GatewayResult<WriteOutcome<PageRecord>> {
        let payload = build_create_payload(space_key, title, body, parent_id);

        self.write(
            WriteAction::CreatePage,
            Method::POST,
            "/content",
            payload,
            dry_run,
        )
        .await?
        .and_then_applied(|value| self.page_from_response(value))
    }

    /// Partial update against the version read immediately before the write
    pub async fn update_page(
        &self,
        page_id: &str,
        updates: &PageUpdate,
        dry_run: bool,
    ) -> GatewayResult<WriteOutcome<PageRecord>> {
        let current = self.current_page(page_id).await?;
        let payload = build_update_payload(&current, updates);

        self.versioned_write(WriteAction::UpdatePage, page_id, current.version, payload, dry_run)
            .await
    }

    pub async fn archive_page(
        &self,
        page_id: &str,
        dry_run: bool,
    ) -> GatewayResult<WriteOutcome<PageRecord>> {
        let current = self.current_page(page_id).await?;
        let payload = build_archive_payload(&current);

        self.versioned_write(WriteAction::ArchivePage, page_id, current.version, payload, dry_run)
            .await
    }

    async fn versioned_write(
        &self,
        action: WriteAction,
        page_id: &str,
        read_version: u64,
        payload: Value,
        dry_run: bool,
    ) -> GatewayResult<WriteOutcome<PageRecord>> {
        let endpoint = content_endpoint(page_id);

        let outcome = self
            .write(action, Method::PUT, &endpoint, payload, dry_run)
            .await
            .map_err(|err| match err {
                Error::RemoteApi { status: 409, .. } => Error::VersionConflict {
                    page_id: page_id.to_string(),
                    expected: read_version,
                },
                other => other,
            })?;

        outcome.and_then_applied(|value| self.page_from_response(value))
    }

    /// Add all labels in one request; the batch succeeds or fails as a whole
    pub async fn add_labels(
        &self,
        page_id: &str,
        labels: &[String],
        dry_run: bool,
    ) -> GatewayResult<WriteOutcome<LabelsOutput>> {
        let endpoint = format!("{}/label", content_endpoint(page_id));
        let payload = build_labels_payload(labels);

        match self
            .write(WriteAction::AddLabels, Method::POST, &endpoint, payload, dry_run)
            .await?
        {
            WriteOutcome::Preview(preview) => {
                Ok(WriteOutcome::Preview(with_page_id(preview, page_id)))
            }
            WriteOutcome::Applied(value) => {
                let response = decode::<LabelListResponse>(value)?;
                Ok(WriteOutcome::Applied(LabelsOutput {
                    page_id: page_id.to_string(),
                    labels: normalize_labels(response),
                }))
            }
        }
    }

    /// Remove labels one request at a time; failures are reported per label
    pub async fn remove_labels(
        &self,
        page_id: &str,
        labels: &[String],
        dry_run_requested: bool,
    ) -> GatewayResult<WriteOutcome<LabelRemovalOutput>> {
        if dry_run_requested {
            log::info!("dry run: remove_labels {page_id}");
            return Ok(WriteOutcome::Preview(dry_run(
                WriteAction::RemoveLabels,
                json!({ "pageId": page_id, "labels": labels }),
            )));
        }

        let mut results = Vec::with_capacity(labels.len());
        for label in labels {
            let endpoint = format!(
                "{}/label/{}",
                content_endpoint(page_id),
                urlencoding::encode(label)
            );

            let result = match self.request(Method::DELETE, &endpoint, &[], None).await {
                Ok(_) => LabelRemoval {
                    label: label.clone(),
                    success: true,
                    error: None,
                },
                Err(err) => {
                    log::warn!("failed to remove label {label} from {page_id}: {err}");
                    LabelRemoval {
                        label: label.clone(),
                        success: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let partial_failure = results.iter().any(|r| !r.success);

        Ok(WriteOutcome::Applied(LabelRemovalOutput {
            page_id: page_id.to_string(),
            results,
            partial_failure,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::confluence::testing::{MockServer, Stub};

    fn page_json(version: u64) -> Value {
        json!({
            "id": "42",
            "type": "page",
            "status": "current",
            "title": "Runbook",
            "space": { "key": "OPS", "name": "Operations" },
            "version": { "number": version }
        })
    }

    #[tokio::test]
    async fn test_create_page_dry_run_sends_nothing() {
        let server = MockServer::start(vec![]).await;

        let outcome = server
            .client()
            .create_page("OPS", "New Runbook", "<p>Hi</p>", Some("7"), true)
            .await
            .unwrap();

        let preview = outcome.preview().unwrap();
        assert_eq!(preview["dryRun"], true);
        assert_eq!(preview["action"], "create_page");
        assert_eq!(preview["ancestors"], json!([{ "id": "7" }]));
        assert_eq!(preview["body"]["storage"]["value"], "<p>Hi</p>");
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_page_preview_matches_live_payload() {
        let server = MockServer::start(vec![Stub::post("/wiki/rest/api/content", page_json(1))]).await;
        let client = server.client();

        let preview = client
            .create_page("OPS", "Runbook", "<p>Hi</p>", None, true)
            .await
            .unwrap();
        let created = client
            .create_page("OPS", "Runbook", "<p>Hi</p>", None, false)
            .await
            .unwrap()
            .applied()
            .unwrap();

        let sent = server.mutations()[0].body.clone().unwrap();
        let mut preview = preview.preview().unwrap().clone();
        let fields = preview.as_object_mut().unwrap();
        fields.remove("dryRun");
        fields.remove("action");

        assert_eq!(preview, sent);
        assert!(sent.get("ancestors").is_none());
        assert_eq!(created.version, 1);
    }

    #[tokio::test]
    async fn test_update_page_increments_read_version() {
        let server = MockServer::start(vec![
            Stub::get("/wiki/rest/api/content/42", page_json(4)),
            Stub::put("/wiki/rest/api/content/42", page_json(5)),
        ])
        .await;

        let updates = PageUpdate {
            title: Some("Runbook v2".to_string()),
            ..Default::default()
        };
        let updated = server
            .client()
            .update_page("42", &updates, false)
            .await
            .unwrap()
            .applied()
            .unwrap();

        let put = &server.mutations()[0];
        let body = put.body.as_ref().unwrap();
        assert_eq!(put.method, "PUT");
        assert_eq!(body["version"]["number"], 5);
        assert_eq!(body["title"], "Runbook v2");
        assert!(body.get("body").is_none());
        assert_eq!(updated.version, 5);
    }

    #[tokio::test]
    async fn test_sequential_updates_use_latest_version() {
        let server = MockServer::start(vec![
            Stub::get("/wiki/rest/api/content/42", page_json(4)).once(),
            Stub::put("/wiki/rest/api/content/42", page_json(5)).once(),
            Stub::get("/wiki/rest/api/content/42", page_json(5)).once(),
            Stub::put("/wiki/rest/api/content/42", page_json(6)).once(),
        ])
        .await;
        let client = server.client();
        let updates = PageUpdate {
            body: Some("<p>again</p>".to_string()),
            ..Default::default()
        };

        let first = client.update_page("42", &updates, false).await.unwrap();
        let second = client.update_page("42", &updates, false).await.unwrap();

        let versions: Vec<Value> = server
            .mutations()
            .iter()
            .map(|r| r.body.as_ref().unwrap()["version"]["number"].clone())
            .collect();
        assert_eq!(versions, vec![json!(5), json!(6)]);
        assert_eq!(first.applied().unwrap().version, 5);
        assert_eq!(second.applied().unwrap().version, 6);
    }

    #[tokio::test]
    async fn test_update_page_dry_run_reads_but_does_not_write() {
        let server =
            MockServer::start(vec![Stub::get("/wiki/rest/api/content/42", page_json(8))]).await;

        let outcome = server
            .client()
            .update_page(
                "42",
                &PageUpdate {
                    body: Some("<p>b</p>".to_string()),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();

        let preview = outcome.preview().unwrap();
        assert_eq!(preview["action"], "update_page");
        assert_eq!(preview["version"]["number"], 9);
        assert!(server.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_update_page_preview_matches_live_payload() {
        let server = MockServer::start(vec![
            Stub::get("/wiki/rest/api/content/42", page_json(6)),
            Stub::put("/wiki/rest/api/content/42", page_json(7)),
        ])
        .await;
        let client = server.client();
        let updates = PageUpdate {
            body: Some("<p>new</p>".to_string()),
            message: Some("tidy up".to_string()),
            ..Default::default()
        };

        let preview = client.update_page("42", &updates, true).await.unwrap();
        client.update_page("42", &updates, false).await.unwrap();

        let sent = server.mutations()[0].body.clone().unwrap();
        let mut preview = preview.preview().unwrap().clone();
        let fields = preview.as_object_mut().unwrap();
        fields.remove("dryRun");
        fields.remove("action");

        assert_eq!(preview, sent);
        assert_eq!(sent["version"]["number"], 7);
        assert_eq!(sent["title"], "Runbook");
    }

    #[tokio::test]
    async fn test_update_page_rejects_login_page_instead_of_content() {
        let server = MockServer::start(vec![Stub::raw(
            Method::GET,
            "/wiki/rest/api/content/42",
            "<html>login</html>",
        )])
        .await;

        let updates = PageUpdate {
            title: Some("x".to_string()),
            ..Default::default()
        };
        let err = server
            .client()
            .update_page("42", &updates, false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Serialization(_)));
        assert!(server.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_archive_page_requires_server_version() {
        let server = MockServer::start(vec![Stub::get(
            "/wiki/rest/api/content/42",
            json!({ "id": "42", "type": "page", "title": "Runbook" }),
        )])
        .await;

        let err = server.client().archive_page("42", false).await.unwrap_err();

        assert!(matches!(err, Error::Serialization(_)));
        assert!(server.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_update_conflict_is_distinct_error() {
        let server = MockServer::start(vec![
            Stub::get("/wiki/rest/api/content/42", page_json(2)),
            Stub::put(
                "/wiki/rest/api/content/42",
                json!({ "message": "Version must be incremented on update" }),
            )
            .status(409),
        ])
        .await;

        let err = server
            .client()
            .update_page("42", &PageUpdate::default(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VersionConflict { expected: 2, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_archive_page() {
        let server = MockServer::start(vec![
            Stub::get("/wiki/rest/api/content/42", page_json(3)),
            Stub::put("/wiki/rest/api/content/42", page_json(4)),
        ])
        .await;

        server.client().archive_page("42", false).await.unwrap();

        let body = server.mutations()[0].body.clone().unwrap();
        assert_eq!(body["status"], "archived");
        assert_eq!(body["version"]["number"], 4);
    }

    #[tokio::test]
    async fn test_archive_page_dry_run() {
        let server =
            MockServer::start(vec![Stub::get("/wiki/rest/api/content/42", page_json(3))]).await;

        let outcome = server.client().archive_page("42", true).await.unwrap();

        let preview = outcome.preview().unwrap();
        assert_eq!(preview["dryRun"], true);
        assert_eq!(preview["action"], "archive_page");
        assert_eq!(preview["status"], "archived");
        assert_eq!(preview["version"]["number"], 4);
        assert!(server.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_add_labels_single_batch() {
        let server = MockServer::start(vec![Stub::post(
            "/wiki/rest/api/content/42/label",
            json!({ "results": [ { "name": "runbook" }, { "name": "ops" } ] }),
        )])
        .await;
        let labels = vec!["runbook".to_string(), "ops".to_string()];

        let output = server
            .client()
            .add_labels("42", &labels, false)
            .await
            .unwrap()
            .applied()
            .unwrap();

        let mutations = server.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(
            mutations[0].body.clone().unwrap(),
            json!([{ "prefix": "global", "name": "runbook" }, { "prefix": "global", "name": "ops" }])
        );
        assert_eq!(output.labels, labels);
    }

    #[tokio::test]
    async fn test_add_labels_failure_fails_whole_call() {
        let server = MockServer::start(vec![Stub::post(
            "/wiki/rest/api/content/42/label",
            json!({ "message": "Invalid label" }),
        )
        .status(400)])
        .await;

        let err = server
            .client()
            .add_labels("42", &["bad label".to_string()], false)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteApi { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_add_labels_dry_run() {
        let server = MockServer::start(vec![]).await;

        let outcome = server
            .client()
            .add_labels("42", &["docs".to_string()], true)
            .await
            .unwrap();

        let preview = outcome.preview().unwrap();
        assert_eq!(preview["pageId"], "42");
        assert_eq!(preview["payload"][0]["name"], "docs");
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_remove_labels_reports_partial_failure() {
        let server = MockServer::start(vec![
            Stub::delete("/wiki/rest/api/content/42/label/a"),
            Stub::raw(
                Method::DELETE,
                "/wiki/rest/api/content/42/label/b",
                r#"{"message":"Label not found"}"#,
            )
            .status(404),
        ])
        .await;

        let output = server
            .client()
            .remove_labels("42", &["a".to_string(), "b".to_string()], false)
            .await
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(output.results.len(), 2);
        assert!(output.results[0].success);
        assert_eq!(output.results[0].label, "a");
        assert!(!output.results[1].success);
        assert!(output.results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("Label not found"));
        assert!(output.partial_failure);
    }

    #[tokio::test]
    async fn test_remove_labels_dry_run() {
        let server = MockServer::start(vec![]).await;

        let outcome = server
            .client()
            .remove_labels("42", &["a".to_string()], true)
            .await
            .unwrap();

        let preview = outcome.preview().unwrap();
        assert_eq!(preview["action"], "remove_labels");
        assert_eq!(preview["labels"], json!(["a"]));
        assert!(server.requests().is_empty());
    }
}
