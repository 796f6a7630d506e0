//! Pure transformation functions from raw Confluence responses to stable records
//!
//! This module contains zero I/O operations and is fully testable with fixture data.
//! Every absent nested field is mapped to a defined default here so nothing downstream
//! has to reason about partially expanded resources.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::types::{
    ContentListResponse, ContentResponse, LabelListResponse, LabelResponse, SearchHitResponse,
    SearchResponse, SpaceListResponse, SpaceResponse, UserResponse,
};

/// Context path every Confluence Cloud web link is relative to
pub const WIKI_PATH: &str = "/wiki";

/// Body format reported when the server omits the representation tag
pub const DEFAULT_BODY_FORMAT: &str = "storage";

// ============================================================================
// Output Models (Domain Model)
// ============================================================================

/// Requested window of a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub start: usize,
}

impl PageRequest {
    pub fn new(limit: usize, start: usize) -> Self {
        Self { limit, start }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: 25,
            start: 0,
        }
    }
}

/// Stable result envelope shared by every list and search operation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub results: Vec<T>,
    pub limit: usize,
    pub start: usize,
    pub size: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<usize>,
}

impl<T> Envelope<T> {
    fn new(mut results: Vec<T>, request: PageRequest, has_more: bool) -> Self {
        results.truncate(request.limit);
        Self {
            size: results.len(),
            results,
            limit: request.limit,
            start: request.start,
            has_more,
            total_size: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummary {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Full page record, one per fetch
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: String,
    pub status: String,
    pub title: String,
    pub space_key: String,
    pub space_name: String,
    pub version: u64,
    pub body: String,
    pub body_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    pub labels: Vec<String>,
    /// Root-to-parent order
    pub ancestors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Listing projection of a page (no body)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Current principal
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// ============================================================================
// Pure Helper Functions
// ============================================================================

/// Absolute web URL for a link relative to the wiki context path
pub fn web_url(base_url: &str, relative: Option<&str>) -> Option<String> {
    relative.map(|path| format!("{}{WIKI_PATH}{path}", base_url.trim_end_matches('/')))
}

/// `hasMore` is driven by the presence of a `next` link, never by counting
fn has_next(next: Option<&String>) -> bool {
    next.is_some_and(|link| !link.is_empty())
}

/// Convert Confluence storage markup to plain text
///
/// Used for human-readable CLI output only; the analysis engine always works
/// on the raw markup.
pub fn storage_to_plaintext(html: &str) -> String {
    let text = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n")
        .replace("</li>", "\n")
        .replace("</h1>", "\n")
        .replace("</h2>", "\n")
        .replace("</h3>", "\n");

    static RE_TAG: OnceLock<Regex> = OnceLock::new();
    let re_tag = RE_TAG.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let cleaned = re_tag.replace_all(&text, "");

    let decoded = html_escape::decode_html_entities(&cleaned);

    decoded
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Pure Transformation Functions
// ============================================================================

pub fn normalize_space(space: SpaceResponse, base_url: &str) -> SpaceSummary {
    SpaceSummary {
        url: web_url(base_url, space.links.webui.as_deref()),
        key: space.key,
        name: space.name,
        space_type: space.space_type,
        status: space.status,
    }
}

pub fn normalize_spaces(
    response: SpaceListResponse,
    base_url: &str,
    request: PageRequest,
) -> Envelope<SpaceSummary> {
    let has_more = has_next(response.links.next.as_ref());
    let results = response
        .results
        .into_iter()
        .map(|space| normalize_space(space, base_url))
        .collect();

    Envelope::new(results, request, has_more)
}

/// Label name, or `None` for entries the server returned without one
pub fn normalize_label(label: LabelResponse) -> Option<String> {
    let name = label.name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Label names in server order, without duplicates
pub fn normalize_labels(response: LabelListResponse) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for name in response.results.into_iter().filter_map(normalize_label) {
        if !labels.contains(&name) {
            labels.push(name);
        }
    }
    labels
}

/// Convert a fully expanded content item into a [`PageRecord`]
///
/// # Arguments
/// * `content` - raw content, usually fetched with `body.storage,version,space,ancestors,metadata.labels,history`
/// * `base_url` - normalized instance URL used for the canonical web link
pub fn normalize_page(content: ContentResponse, base_url: &str) -> PageRecord {
    let url = web_url(base_url, content.links.webui.as_deref());

    let (space_key, space_name) = content
        .space
        .map(|space| {
            (
                space.key.unwrap_or_default(),
                space.name.unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    let version = content.version.as_ref().and_then(|v| v.number).unwrap_or(0);

    let storage = content.body.and_then(|body| body.storage);
    let body_format = storage
        .as_ref()
        .and_then(|s| s.representation.clone())
        .unwrap_or_else(|| DEFAULT_BODY_FORMAT.to_string());
    let body = storage.and_then(|s| s.value).unwrap_or_default();

    let history = content.history.unwrap_or_default();
    let created_by = history.created_by.as_ref().and_then(|user| user.label());
    let created_at = history.created_date.clone();

    // `version` is authoritative for the last change; `history.lastUpdated` fills gaps
    // when only history was expanded.
    let last_updated = history.last_updated.unwrap_or_default();
    let last_modified_at = content
        .version
        .as_ref()
        .and_then(|v| v.when.clone())
        .or(last_updated.when);
    let last_modified_by = content
        .version
        .as_ref()
        .and_then(|v| v.by.as_ref())
        .and_then(|user| user.label())
        .or_else(|| last_updated.by.as_ref().and_then(|user| user.label()));

    let labels = content
        .metadata
        .and_then(|m| m.labels)
        .map(normalize_labels)
        .unwrap_or_default();

    let ancestors = content
        .ancestors
        .unwrap_or_default()
        .into_iter()
        .map(|ancestor| ancestor.id)
        .collect();

    PageRecord {
        id: content.id,
        status: content.status.unwrap_or_else(|| "current".to_string()),
        title: content.title,
        space_key,
        space_name,
        version,
        body,
        body_format,
        created_by,
        created_at,
        last_modified_by,
        last_modified_at,
        labels,
        ancestors,
        url,
    }
}

pub fn normalize_page_summary(content: ContentResponse, base_url: &str) -> PageSummary {
    PageSummary {
        url: web_url(base_url, content.links.webui.as_deref()),
        status: content.status.unwrap_or_else(|| "current".to_string()),
        space_key: content.space.and_then(|s| s.key),
        version: content.version.as_ref().and_then(|v| v.number),
        last_modified_at: content.version.and_then(|v| v.when),
        id: content.id,
        title: content.title,
    }
}

pub fn normalize_pages(
    response: ContentListResponse,
    base_url: &str,
    request: PageRequest,
) -> Envelope<PageSummary> {
    let has_more = has_next(response.links.next.as_ref());
    let results = response
        .results
        .into_iter()
        .map(|content| normalize_page_summary(content, base_url))
        .collect();

    Envelope::new(results, request, has_more)
}

pub fn normalize_search_hit(hit: SearchHitResponse, base_url: &str) -> SearchHit {
    let content = hit.content.unwrap_or_default();
    let title = hit
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| content.title.clone());
    let relative = hit.url.or(content.links.webui);

    SearchHit {
        id: content.id,
        title,
        content_type: content
            .content_type
            .or(hit.entity_type)
            .unwrap_or_else(|| "page".to_string()),
        space_key: content.space.and_then(|s| s.key),
        excerpt: hit.excerpt.filter(|e| !e.is_empty()),
        last_modified_at: hit.last_modified,
        url: web_url(base_url, relative.as_deref()),
    }
}

/// Normalize a CQL search response; the envelope carries the server's `totalSize`
pub fn normalize_search(
    response: SearchResponse,
    base_url: &str,
    request: PageRequest,
) -> Envelope<SearchHit> {
    let has_more = has_next(response.links.next.as_ref());
    let results = response
        .results
        .into_iter()
        .map(|hit| normalize_search_hit(hit, base_url))
        .collect::<Vec<_>>();

    let mut envelope = Envelope::new(results, request, has_more);
    envelope.total_size = Some(response.total_size.unwrap_or(envelope.size));
    envelope
}

pub fn normalize_user(user: UserResponse) -> Identity {
    let display_name = user
        .display_name
        .or(user.public_name)
        .or_else(|| user.email.clone())
        .unwrap_or_default();

    Identity {
        account_id: user.account_id.unwrap_or_default(),
        email: user.email,
        display_name,
        avatar: user.profile_picture.and_then(|p| p.path),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://acme.atlassian.net";

    fn full_page_json() -> serde_json::Value {
        json!({
            "id": "1001",
            "type": "page",
            "status": "current",
            "title": "Deploy Runbook",
            "space": { "key": "OPS", "name": "Operations" },
            "version": {
                "number": 7,
                "when": "2024-03-01T10:00:00.000Z",
                "by": { "displayName": "Ada Lovelace", "accountId": "a-1" }
            },
            "body": { "storage": { "value": "<p>Hello</p>", "representation": "storage" } },
            "history": {
                "createdBy": { "displayName": "Grace Hopper" },
                "createdDate": "2023-01-01T09:00:00.000Z"
            },
            "metadata": { "labels": { "results": [
                { "prefix": "global", "name": "runbook" },
                { "prefix": "global", "name": "ops" },
                { "prefix": "global", "name": "runbook" }
            ] } },
            "ancestors": [ { "id": "1" }, { "id": "20" } ],
            "_links": { "webui": "/spaces/OPS/pages/1001/Deploy+Runbook" }
        })
    }

    #[test]
    fn test_normalize_page_full() {
        let content: ContentResponse = serde_json::from_value(full_page_json()).unwrap();

        let page = normalize_page(content, BASE);

        assert_eq!(page.id, "1001");
        assert_eq!(page.title, "Deploy Runbook");
        assert_eq!(page.space_key, "OPS");
        assert_eq!(page.space_name, "Operations");
        assert_eq!(page.version, 7);
        assert_eq!(page.body, "<p>Hello</p>");
        assert_eq!(page.body_format, "storage");
        assert_eq!(page.created_by.as_deref(), Some("Grace Hopper"));
        assert_eq!(page.last_modified_by.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            page.last_modified_at.as_deref(),
            Some("2024-03-01T10:00:00.000Z")
        );
        assert_eq!(page.labels, vec!["runbook", "ops"]);
        assert_eq!(page.ancestors, vec!["1", "20"]);
        assert_eq!(
            page.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/OPS/pages/1001/Deploy+Runbook")
        );
    }

    #[test]
    fn test_normalize_page_minimal_uses_defaults() {
        let content: ContentResponse =
            serde_json::from_value(json!({ "id": "5", "title": "Bare" })).unwrap();

        let page = normalize_page(content, BASE);

        assert_eq!(page.status, "current");
        assert_eq!(page.version, 0);
        assert_eq!(page.body, "");
        assert_eq!(page.body_format, DEFAULT_BODY_FORMAT);
        assert!(page.labels.is_empty());
        assert!(page.ancestors.is_empty());
        assert_eq!(page.created_by, None);
        assert_eq!(page.last_modified_at, None);
        assert_eq!(page.url, None);
        assert_eq!(page.space_key, "");
    }

    #[test]
    fn test_normalize_page_falls_back_to_history_last_updated() {
        let content: ContentResponse = serde_json::from_value(json!({
            "id": "9",
            "title": "History only",
            "history": { "lastUpdated": { "when": "2022-05-05T00:00:00Z", "by": { "publicName": "ops-bot" } } }
        }))
        .unwrap();

        let page = normalize_page(content, BASE);

        assert_eq!(page.last_modified_at.as_deref(), Some("2022-05-05T00:00:00Z"));
        assert_eq!(page.last_modified_by.as_deref(), Some("ops-bot"));
    }

    #[test]
    fn test_normalize_spaces_has_more_from_next_link() {
        let response: SpaceListResponse = serde_json::from_value(json!({
            "results": [
                { "key": "OPS", "name": "Operations", "type": "global", "_links": { "webui": "/spaces/OPS" } },
                { "key": "DEV", "name": "Development" }
            ],
            "start": 0, "limit": 2, "size": 2,
            "_links": { "next": "/rest/api/space?limit=2&start=2" }
        }))
        .unwrap();

        let envelope = normalize_spaces(response, BASE, PageRequest::new(2, 0));

        assert!(envelope.has_more);
        assert_eq!(envelope.size, 2);
        assert_eq!(envelope.start, 0);
        assert_eq!(envelope.total_size, None);
        assert_eq!(
            envelope.results[0].url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/OPS")
        );
    }

    #[test]
    fn test_normalize_pages_without_next_link() {
        let response: ContentListResponse = serde_json::from_value(json!({
            "results": [ { "id": "1", "title": "A", "version": { "number": 3 } } ],
            "_links": {}
        }))
        .unwrap();

        let envelope = normalize_pages(response, BASE, PageRequest::new(10, 40));

        assert!(!envelope.has_more);
        assert_eq!(envelope.start, 40);
        assert_eq!(envelope.limit, 10);
        assert_eq!(envelope.results[0].version, Some(3));
    }

    #[test]
    fn test_envelope_never_exceeds_limit() {
        let response: ContentListResponse = serde_json::from_value(json!({
            "results": [ { "id": "1" }, { "id": "2" }, { "id": "3" } ]
        }))
        .unwrap();

        let envelope = normalize_pages(response, BASE, PageRequest::new(2, 0));

        assert_eq!(envelope.results.len(), 2);
        assert_eq!(envelope.size, 2);
    }

    #[test]
    fn test_normalize_search_enriches_urls_and_total() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [{
                "content": { "id": "77", "type": "page", "title": "Onboarding", "space": { "key": "HR" } },
                "title": "Onboarding",
                "excerpt": "Welcome aboard",
                "url": "/spaces/HR/pages/77/Onboarding",
                "lastModified": "2024-01-01T00:00:00.000Z"
            }],
            "start": 0, "limit": 25, "size": 1, "totalSize": 42,
            "_links": { "next": "/rest/api/search?cql=...&start=25" }
        }))
        .unwrap();

        let envelope = normalize_search(response, "https://acme.atlassian.net/", PageRequest::new(25, 0));

        assert_eq!(envelope.total_size, Some(42));
        assert!(envelope.has_more);
        let hit = &envelope.results[0];
        assert_eq!(hit.id, "77");
        assert_eq!(hit.space_key.as_deref(), Some("HR"));
        assert_eq!(
            hit.url.as_deref(),
            Some("https://acme.atlassian.net/wiki/spaces/HR/pages/77/Onboarding")
        );
    }

    #[test]
    fn test_normalize_user() {
        let user: UserResponse = serde_json::from_value(json!({
            "accountId": "abc",
            "email": "ada@example.com",
            "displayName": "Ada",
            "profilePicture": { "path": "/wiki/aa-avatar/abc" }
        }))
        .unwrap();

        let identity = normalize_user(user);

        assert_eq!(identity.account_id, "abc");
        assert_eq!(identity.display_name, "Ada");
        assert_eq!(identity.avatar.as_deref(), Some("/wiki/aa-avatar/abc"));
    }

    #[test]
    fn test_storage_to_plaintext() {
        let html = "<h1>Title</h1><p>First &amp; <strong>bold</strong></p><ul><li>One</li></ul>";
        assert_eq!(storage_to_plaintext(html), "Title\nFirst & bold\nOne");
    }

    #[test]
    fn test_normalize_labels_skips_blank_and_duplicate_names() {
        let response: LabelListResponse = serde_json::from_value(json!({
            "results": [
                { "prefix": "global", "name": "runbook" },
                { "prefix": "global", "name": "  " },
                { "prefix": "global", "name": "ops" },
                { "prefix": "my", "name": "runbook" }
            ]
        }))
        .unwrap();

        assert_eq!(normalize_labels(response), vec!["runbook", "ops"]);
    }
}
