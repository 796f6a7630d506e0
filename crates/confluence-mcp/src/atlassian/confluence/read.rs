//! Read operations: identity, spaces, search, pages and children
//!
//! Every call is a fresh remote fetch. Raw responses are handed to the normalizer in the
//! core crate, so this file only deals with endpoints and parameters.

use serde::Serialize;
use serde_json::Value;

use super::client::{decode, ConfluenceClient, GatewayResult};
use crate::error::Error;
use confluence_mcp_core::confluence::normalize::{
    normalize_page, normalize_pages, normalize_search, normalize_spaces, normalize_user,
};
use confluence_mcp_core::confluence::payload::title_lookup_cql;
use confluence_mcp_core::confluence::types::{
    ContentListResponse, ContentResponse, SearchResponse, SpaceListResponse, UserResponse,
};
use confluence_mcp_core::confluence::{
    Envelope, Identity, PageRecord, PageRequest, PageSummary, SearchHit, SpaceSummary,
};

/// Expansion for a full page record
pub const PAGE_EXPAND: &str = "body.storage,version,space,ancestors,metadata.labels,history";

/// Expansion for a page record without its body
pub const METADATA_EXPAND: &str = "version,space,ancestors,metadata.labels,history";

/// Expansion for listings
pub const SUMMARY_EXPAND: &str = "version,space";

/// Expansion applied to the content of each search hit
pub const SEARCH_EXPAND: &str = "content.space,content.version";

/// Result of [`ConfluenceClient::ping`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PingResult {
    pub ok: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode a single content object; a body without an id is not a page
pub(super) fn decode_content(value: Value) -> GatewayResult<ContentResponse> {
    let content = decode::<ContentResponse>(value)?;
    if content.id.is_empty() {
        return Err(Error::Serialization(
            "response is not a Confluence content object".to_string(),
        ));
    }
    Ok(content)
}

fn window(request: PageRequest) -> [(&'static str, String); 2] {
    [
        ("limit", request.limit.to_string()),
        ("start", request.start.to_string()),
    ]
}

impl ConfluenceClient {
    /// Connectivity check that never fails
    pub async fn ping(&self) -> PingResult {
        match self.whoami().await {
            Ok(user) => PingResult {
                ok: true,
                authenticated: true,
                user: Some(user),
                error: None,
            },
            Err(err) => {
                log::warn!("ping failed: {err}");
                PingResult {
                    ok: false,
                    authenticated: false,
                    user: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub async fn whoami(&self) -> GatewayResult<Identity> {
        let value = self.get("/user/current", &[]).await?;
        Ok(normalize_user(decode::<UserResponse>(value)?))
    }

    pub async fn list_spaces(&self, request: PageRequest) -> GatewayResult<Envelope<SpaceSummary>> {
        let value = self.get("/space", &window(request)).await?;
        Ok(normalize_spaces(
            decode::<SpaceListResponse>(value)?,
            self.base_url(),
            request,
        ))
    }

    /// CQL search; the query string is passed through untouched
    pub async fn search(
        &self,
        cql: &str,
        request: PageRequest,
        expand: Option<&str>,
    ) -> GatewayResult<Envelope<SearchHit>> {
        let [limit, start] = window(request);
        let query = [
            ("cql", cql.to_string()),
            limit,
            start,
            ("expand", expand.unwrap_or(SEARCH_EXPAND).to_string()),
        ];

        let value = self.get("/search", &query).await?;
        Ok(normalize_search(
            decode::<SearchResponse>(value)?,
            self.base_url(),
            request,
        ))
    }

    /// Exact-title lookup, followed by a full fetch of the first hit
    pub async fn get_page_by_title(
        &self,
        space_key: &str,
        title: &str,
        expand: Option<&str>,
    ) -> GatewayResult<PageRecord> {
        let cql = title_lookup_cql(space_key, title);
        let hits = self.search(&cql, PageRequest::new(1, 0), None).await?;

        let Some(hit) = hits.results.into_iter().next().filter(|h| !h.id.is_empty()) else {
            return Err(Error::NotFound {
                title: title.to_string(),
                space_key: space_key.to_string(),
            });
        };

        self.get_page(&hit.id, expand).await
    }

    pub async fn list_pages(
        &self,
        space_key: &str,
        request: PageRequest,
        expand: Option<&str>,
    ) -> GatewayResult<Envelope<PageSummary>> {
        let [limit, start] = window(request);
        let query = [
            ("type", "page".to_string()),
            ("spaceKey", space_key.to_string()),
            limit,
            start,
            ("expand", expand.unwrap_or(SUMMARY_EXPAND).to_string()),
        ];

        let value = self.get("/content", &query).await?;
        Ok(normalize_pages(
            decode::<ContentListResponse>(value)?,
            self.base_url(),
            request,
        ))
    }

    pub async fn get_page(&self, page_id: &str, expand: Option<&str>) -> GatewayResult<PageRecord> {
        let query = [("expand", expand.unwrap_or(PAGE_EXPAND).to_string())];
        let endpoint = format!("/content/{}", urlencoding::encode(page_id));

        let value = self.get(&endpoint, &query).await?;
        Ok(normalize_page(decode_content(value)?, self.base_url()))
    }

    /// Page record without the body
    pub async fn get_page_metadata(&self, page_id: &str) -> GatewayResult<PageRecord> {
        self.get_page(page_id, Some(METADATA_EXPAND)).await
    }

    /// Direct children only
    pub async fn get_children(
        &self,
        page_id: &str,
        request: PageRequest,
    ) -> GatewayResult<Envelope<PageSummary>> {
        let [limit, start] = window(request);
        let query = [limit, start, ("expand", SUMMARY_EXPAND.to_string())];
        let endpoint = format!("/content/{}/child/page", urlencoding::encode(page_id));

        let value = self.get(&endpoint, &query).await?;
        Ok(normalize_pages(
            decode::<ContentListResponse>(value)?,
            self.base_url(),
            request,
        ))
    }
}
