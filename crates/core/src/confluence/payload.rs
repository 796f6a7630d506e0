//! Write payload builders and dry-run previews
//!
//! Every mutation the gateway performs is described here as plain JSON first. The gateway
//! either sends the value as-is or, in dry-run mode, returns it wrapped by [`dry_run`].
//! Keeping the construction pure is what lets a preview match a live request exactly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::normalize::PageRecord;

/// Storage format tag sent with every body
pub const STORAGE_REPRESENTATION: &str = "storage";

/// Status value that archives a page
pub const ARCHIVED_STATUS: &str = "archived";

/// Write operations the gateway knows how to preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    CreatePage,
    UpdatePage,
    AddLabels,
    RemoveLabels,
    ArchivePage,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::CreatePage => "create_page",
            WriteAction::UpdatePage => "update_page",
            WriteAction::AddLabels => "add_labels",
            WriteAction::RemoveLabels => "remove_labels",
            WriteAction::ArchivePage => "archive_page",
        }
    }
}

impl std::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update request; `None` fields are left untouched server-side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Version comment shown in the page history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PageUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

fn storage_body(value: &str) -> Value {
    json!({
        "storage": {
            "value": value,
            "representation": STORAGE_REPRESENTATION,
        }
    })
}

/// Version immediately following the one last read from the server
pub fn next_version(current: &PageRecord) -> u64 {
    current.version + 1
}

/// Payload for `POST /content`
///
/// `ancestors` is only present when a parent is supplied.
pub fn build_create_payload(
    space_key: &str,
    title: &str,
    body: &str,
    parent_id: Option<&str>,
) -> Value {
    let mut payload = json!({
        "type": "page",
        "title": title,
        "space": { "key": space_key },
        "body": storage_body(body),
    });

    if let Some(parent) = parent_id {
        payload["ancestors"] = json!([{ "id": parent }]);
    }

    payload
}

/// Payload for `PUT /content/{id}`
///
/// The API rejects updates without a title, so the current title is re-sent when the
/// caller does not change it. The body is only included when supplied.
pub fn build_update_payload(current: &PageRecord, updates: &PageUpdate) -> Value {
    let mut version = json!({ "number": next_version(current) });
    if let Some(message) = &updates.message {
        version["message"] = json!(message);
    }

    let mut payload = json!({
        "id": current.id,
        "type": "page",
        "title": updates.title.as_deref().unwrap_or(&current.title),
        "version": version,
    });

    if let Some(body) = &updates.body {
        payload["body"] = storage_body(body);
    }

    payload
}

/// Payload for archiving a page: same contract as an update with the status flipped
pub fn build_archive_payload(current: &PageRecord) -> Value {
    json!({
        "id": current.id,
        "type": "page",
        "title": current.title,
        "status": ARCHIVED_STATUS,
        "version": { "number": next_version(current) },
    })
}

/// Payload for `POST /content/{id}/label`
pub fn build_labels_payload(labels: &[String]) -> Value {
    Value::Array(
        labels
            .iter()
            .map(|name| json!({ "prefix": "global", "name": name }))
            .collect(),
    )
}

/// Wrap a would-be request into a dry-run preview
///
/// Object payloads are flattened next to the `dryRun`/`action` tags; any other JSON value
/// is placed under `payload`.
pub fn dry_run(action: WriteAction, payload: Value) -> Value {
    let mut preview = Map::new();
    preview.insert("dryRun".to_string(), Value::Bool(true));
    preview.insert("action".to_string(), Value::String(action.to_string()));

    match payload {
        Value::Object(fields) => {
            for (key, value) in fields {
                preview.entry(key).or_insert(value);
            }
        }
        other => {
            preview.insert("payload".to_string(), other);
        }
    }

    Value::Object(preview)
}

/// Escape a value for use inside a double-quoted CQL literal
pub fn escape_cql_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Exact-title lookup query for a page in a space
pub fn title_lookup_cql(space_key: &str, title: &str) -> String {
    format!(
        "type=page AND space=\"{}\" AND title=\"{}\"",
        escape_cql_literal(space_key),
        escape_cql_literal(title)
    )
}
