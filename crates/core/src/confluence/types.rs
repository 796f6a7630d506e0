//! Raw response models for the Confluence Cloud REST API (`/wiki/rest/api`).
//!
//! Every nested structure is optional on the wire: which parts show up depends on the
//! `expand` parameter sent with the request. All fields therefore carry serde defaults so
//! deserialization never fails on a partially expanded resource.

use serde::{Deserialize, Serialize};

// ============================================================================
// Shared structures
// ============================================================================

/// HATEOAS links attached to most resources
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ResourceLinks {
    #[serde(default)]
    pub webui: Option<String>,
    #[serde(default)]
    pub tinyui: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
}

/// Actor reference (`version.by`, `history.createdBy`, ...)
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct UserRef {
    #[serde(default, rename = "accountId")]
    pub account_id: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "publicName")]
    pub public_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRef {
    /// Best human label for the actor
    pub fn label(&self) -> Option<String> {
        self.display_name
            .clone()
            .or_else(|| self.public_name.clone())
            .or_else(|| self.email.clone())
            .or_else(|| self.account_id.clone())
    }
}

// ============================================================================
// Spaces
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SpaceResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub space_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "_links")]
    pub links: ResourceLinks,
}

/// Paginated list of spaces (`GET /space`)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SpaceListResponse {
    #[serde(default)]
    pub results: Vec<SpaceResponse>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default, rename = "_links")]
    pub links: ResourceLinks,
}

// ============================================================================
// Content (pages)
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ContentSpace {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct VersionResponse {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub by: Option<UserRef>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BodyRepresentation {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub representation: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ContentBody {
    #[serde(default)]
    pub storage: Option<BodyRepresentation>,
    #[serde(default)]
    pub view: Option<BodyRepresentation>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LastUpdated {
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub by: Option<UserRef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ContentHistory {
    #[serde(default, rename = "createdBy")]
    pub created_by: Option<UserRef>,
    #[serde(default, rename = "createdDate")]
    pub created_date: Option<String>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<LastUpdated>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LabelResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LabelListResponse {
    #[serde(default)]
    pub results: Vec<LabelResponse>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ContentMetadata {
    #[serde(default)]
    pub labels: Option<LabelListResponse>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AncestorRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A content item (`GET /content/{id}`), the raw form of a page
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ContentResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub space: Option<ContentSpace>,
    #[serde(default)]
    pub version: Option<VersionResponse>,
    #[serde(default)]
    pub body: Option<ContentBody>,
    #[serde(default)]
    pub history: Option<ContentHistory>,
    #[serde(default)]
    pub metadata: Option<ContentMetadata>,
    #[serde(default)]
    pub ancestors: Option<Vec<AncestorRef>>,
    #[serde(default, rename = "_links")]
    pub links: ResourceLinks,
}

/// Paginated content listing (`GET /content`, `GET /content/{id}/child/page`)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContentListResponse {
    #[serde(default)]
    pub results: Vec<ContentResponse>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default, rename = "_links")]
    pub links: ResourceLinks,
}

// ============================================================================
// Search
// ============================================================================

/// A single CQL search hit (`GET /search`)
///
/// `url` is relative to the `/wiki` context path.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SearchHitResponse {
    #[serde(default)]
    pub content: Option<ContentResponse>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "entityType")]
    pub entity_type: Option<String>,
    #[serde(default, rename = "lastModified")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHitResponse>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default, rename = "totalSize")]
    pub total_size: Option<usize>,
    #[serde(default, rename = "_links")]
    pub links: ResourceLinks,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProfilePicture {
    #[serde(default)]
    pub path: Option<String>,
}

/// Current principal (`GET /user/current`)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserResponse {
    #[serde(default, rename = "accountId")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "publicName")]
    pub public_name: Option<String>,
    #[serde(default, rename = "profilePicture")]
    pub profile_picture: Option<ProfilePicture>,
}
