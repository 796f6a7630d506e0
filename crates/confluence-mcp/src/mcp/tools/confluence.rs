//! Confluence tool registry
//!
//! Every tool the server exposes is a variant of [`ConfluenceTool`]; its name, schema and
//! handler are all reached through exhaustive matches, so adding a variant without wiring it
//! up fails to compile.
//!
//! Gateway failures do not become JSON-RPC errors. They are reported as a tool result with
//! `isError: true` whose text is `{error, operation, arguments}`. Malformed arguments are a
//! protocol error (`-32602`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{CallToolResult, Content, JsonRpcError, ServerContext};
use crate::error::Error;
use crate::prelude::eprintln;
use confluence_mcp_core::confluence::{PageRequest, PageUpdate, WriteAction};

const DEFAULT_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfluenceTool {
    Ping,
    Whoami,
    ListSpaces,
    Search,
    GetPage,
    GetPageByTitle,
    GetPageMetadata,
    ListPages,
    GetChildren,
    CreatePage,
    UpdatePage,
    AddLabels,
    RemoveLabels,
    ArchivePage,
    AnalyzePage,
    SuggestImprovements,
}

impl ConfluenceTool {
    pub const ALL: [ConfluenceTool; 16] = [
        ConfluenceTool::Ping,
        ConfluenceTool::Whoami,
        ConfluenceTool::ListSpaces,
        ConfluenceTool::Search,
        ConfluenceTool::GetPage,
        ConfluenceTool::GetPageByTitle,
        ConfluenceTool::GetPageMetadata,
        ConfluenceTool::ListPages,
        ConfluenceTool::GetChildren,
        ConfluenceTool::CreatePage,
        ConfluenceTool::UpdatePage,
        ConfluenceTool::AddLabels,
        ConfluenceTool::RemoveLabels,
        ConfluenceTool::ArchivePage,
        ConfluenceTool::AnalyzePage,
        ConfluenceTool::SuggestImprovements,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfluenceTool::Ping => "confluence_ping",
            ConfluenceTool::Whoami => "confluence_whoami",
            ConfluenceTool::ListSpaces => "confluence_list_spaces",
            ConfluenceTool::Search => "confluence_search",
            ConfluenceTool::GetPage => "confluence_get_page",
            ConfluenceTool::GetPageByTitle => "confluence_get_page_by_title",
            ConfluenceTool::GetPageMetadata => "confluence_get_page_metadata",
            ConfluenceTool::ListPages => "confluence_list_pages",
            ConfluenceTool::GetChildren => "confluence_get_children",
            ConfluenceTool::CreatePage => "confluence_create_page",
            ConfluenceTool::UpdatePage => "confluence_update_page",
            ConfluenceTool::AddLabels => "confluence_add_labels",
            ConfluenceTool::RemoveLabels => "confluence_remove_labels",
            ConfluenceTool::ArchivePage => "confluence_archive_page",
            ConfluenceTool::AnalyzePage => "confluence_analyze_page",
            ConfluenceTool::SuggestImprovements => "confluence_suggest_improvements",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Write action performed by the tool, if any
    pub fn write_action(&self) -> Option<WriteAction> {
        match self {
            ConfluenceTool::CreatePage => Some(WriteAction::CreatePage),
            ConfluenceTool::UpdatePage => Some(WriteAction::UpdatePage),
            ConfluenceTool::AddLabels => Some(WriteAction::AddLabels),
            ConfluenceTool::RemoveLabels => Some(WriteAction::RemoveLabels),
            ConfluenceTool::ArchivePage => Some(WriteAction::ArchivePage),
            ConfluenceTool::Ping
            | ConfluenceTool::Whoami
            | ConfluenceTool::ListSpaces
            | ConfluenceTool::Search
            | ConfluenceTool::GetPage
            | ConfluenceTool::GetPageByTitle
            | ConfluenceTool::GetPageMetadata
            | ConfluenceTool::ListPages
            | ConfluenceTool::GetChildren
            | ConfluenceTool::AnalyzePage
            | ConfluenceTool::SuggestImprovements => None,
        }
    }

    pub fn requires_write(&self) -> bool {
        self.write_action().is_some()
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConfluenceTool::Ping => "Check connectivity and credentials against Confluence. Never fails; returns ok/authenticated flags and the error message when the check does not pass.",
            ConfluenceTool::Whoami => "Return the account id, display name, email and avatar of the authenticated user.",
            ConfluenceTool::ListSpaces => "List Confluence spaces visible to the authenticated user. Paginated with limit/start; hasMore tells whether another page exists.",
            ConfluenceTool::Search => "Search Confluence content using CQL (Confluence Query Language). Returns matching content with title, type, space, excerpt and absolute URL, plus the total number of matches.",
            ConfluenceTool::GetPage => "Get a page by id, including its storage-format body, version, space, labels, ancestors and history.",
            ConfluenceTool::GetPageByTitle => "Get a page by its exact title within a space. Fails when no page with that title exists.",
            ConfluenceTool::GetPageMetadata => "Get a page's metadata (version, space, labels, ancestors, history) without the body.",
            ConfluenceTool::ListPages => "List pages in a space. Paginated with limit/start.",
            ConfluenceTool::GetChildren => "List the direct child pages of a page. Paginated with limit/start.",
            ConfluenceTool::CreatePage => "Create a page in a space from storage-format content, optionally under a parent page. Requires CONFLUENCE_ENABLE_WRITES unless dryRun is set; dryRun returns the payload without sending it.",
            ConfluenceTool::UpdatePage => "Update a page's title and/or body. Reads the current version first and writes version + 1; fails with a version conflict if the page changed in between. Requires CONFLUENCE_ENABLE_WRITES unless dryRun is set.",
            ConfluenceTool::AddLabels => "Add labels to a page in a single request; either all labels are added or the call fails. Requires CONFLUENCE_ENABLE_WRITES unless dryRun is set.",
            ConfluenceTool::RemoveLabels => "Remove labels from a page one at a time. Reports success or failure per label. Requires CONFLUENCE_ENABLE_WRITES unless dryRun is set.",
            ConfluenceTool::ArchivePage => "Archive a page. Reads the current version first and writes version + 1 with archived status. Requires CONFLUENCE_ENABLE_WRITES unless dryRun is set.",
            ConfluenceTool::AnalyzePage => "Review a page against documentation best practices: title conventions, owner and review metadata, structure, labels, staleness and nesting depth. Returns findings with severity, category and recommendation, plus a summary.",
            ConfluenceTool::SuggestImprovements => "Analyze a page and return concrete remediation actions for each finding, with a list of priority items (errors and warnings).",
        }
    }

    pub fn input_schema(&self) -> Value {
        let page_id = json!({ "type": "string", "description": "Confluence page id" });
        let limit = json!({ "type": "integer", "minimum": 0, "description": "Maximum number of results to return (default: 25)" });
        let start = json!({ "type": "integer", "minimum": 0, "description": "Offset of the first result (default: 0)" });
        let dry_run = json!({ "type": "boolean", "description": "Return the request payload without sending it (default: false)" });
        let labels = json!({ "type": "array", "items": { "type": "string" }, "description": "Label names" });
        let expand = json!({ "type": "string", "description": "Comma separated list of properties to expand" });

        match self {
            ConfluenceTool::Ping | ConfluenceTool::Whoami => json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            ConfluenceTool::ListSpaces => json!({
                "type": "object",
                "properties": { "limit": limit, "start": start },
                "required": []
            }),
            ConfluenceTool::Search => json!({
                "type": "object",
                "properties": {
                    "cql": {
                        "type": "string",
                        "description": "CQL query (e.g., 'space = DOC AND text ~ \"deploy\"')"
                    },
                    "limit": limit,
                    "start": start,
                    "expand": expand
                },
                "required": ["cql"]
            }),
            ConfluenceTool::GetPage => json!({
                "type": "object",
                "properties": { "pageId": page_id, "expand": expand },
                "required": ["pageId"]
            }),
            ConfluenceTool::GetPageByTitle => json!({
                "type": "object",
                "properties": {
                    "spaceKey": { "type": "string", "description": "Space key (e.g., 'DOC')" },
                    "title": { "type": "string", "description": "Exact page title" },
                    "expand": expand
                },
                "required": ["spaceKey", "title"]
            }),
            ConfluenceTool::GetPageMetadata
            | ConfluenceTool::AnalyzePage
            | ConfluenceTool::SuggestImprovements => json!({
                "type": "object",
                "properties": { "pageId": page_id },
                "required": ["pageId"]
            }),
            ConfluenceTool::ListPages => json!({
                "type": "object",
                "properties": {
                    "spaceKey": { "type": "string", "description": "Space key (e.g., 'DOC')" },
                    "limit": limit,
                    "start": start,
                    "expand": expand
                },
                "required": ["spaceKey"]
            }),
            ConfluenceTool::GetChildren => json!({
                "type": "object",
                "properties": { "pageId": page_id, "limit": limit, "start": start },
                "required": ["pageId"]
            }),
            ConfluenceTool::CreatePage => json!({
                "type": "object",
                "properties": {
                    "spaceKey": { "type": "string", "description": "Space key to create the page in" },
                    "title": { "type": "string", "description": "Page title" },
                    "body": { "type": "string", "description": "Page content in storage format (XHTML)" },
                    "parentId": { "type": "string", "description": "Id of the parent page (optional)" },
                    "dryRun": dry_run
                },
                "required": ["spaceKey", "title", "body"]
            }),
            ConfluenceTool::UpdatePage => json!({
                "type": "object",
                "properties": {
                    "pageId": page_id,
                    "title": { "type": "string", "description": "New title (optional)" },
                    "body": { "type": "string", "description": "New content in storage format (optional)" },
                    "versionMessage": { "type": "string", "description": "Comment recorded with the new version (optional)" },
                    "dryRun": dry_run
                },
                "required": ["pageId"]
            }),
            ConfluenceTool::AddLabels | ConfluenceTool::RemoveLabels => json!({
                "type": "object",
                "properties": { "pageId": page_id, "labels": labels, "dryRun": dry_run },
                "required": ["pageId", "labels"]
            }),
            ConfluenceTool::ArchivePage => json!({
                "type": "object",
                "properties": { "pageId": page_id, "dryRun": dry_run },
                "required": ["pageId"]
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowArgs {
    limit: Option<usize>,
    start: Option<usize>,
}

impl WindowArgs {
    fn request(&self) -> PageRequest {
        PageRequest::new(self.limit.unwrap_or(DEFAULT_LIMIT), self.start.unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    cql: String,
    #[serde(flatten)]
    window: WindowArgs,
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageArgs {
    page_id: String,
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleArgs {
    space_key: String,
    title: String,
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpacePagesArgs {
    space_key: String,
    #[serde(flatten)]
    window: WindowArgs,
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenArgs {
    page_id: String,
    #[serde(flatten)]
    window: WindowArgs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    space_key: String,
    title: String,
    body: String,
    parent_id: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    page_id: String,
    title: Option<String>,
    body: Option<String>,
    version_message: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelArgs {
    page_id: String,
    labels: Vec<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveArgs {
    page_id: String,
    #[serde(default)]
    dry_run: bool,
}

/// Why a tool call did not produce output
#[derive(Debug)]
enum ToolFailure {
    /// Arguments that do not match the tool's schema
    InvalidArguments(String),
    /// Well-formed arguments that ask for something the operation refuses to do
    Rejected(String),
    Gateway(Error),
}

impl From<Error> for ToolFailure {
    fn from(err: Error) -> Self {
        ToolFailure::Gateway(err)
    }
}

#[derive(Debug, Serialize)]
struct ToolErrorPayload<'a> {
    error: String,
    operation: &'a str,
    arguments: &'a Value,
}

fn parse<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolFailure> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolFailure::InvalidArguments(format!("Invalid arguments: {e}")))
}

fn output<T: Serialize>(data: T) -> Result<Value, ToolFailure> {
    serde_json::to_value(data).map_err(|e| ToolFailure::Gateway(e.into()))
}

fn text_result(text: String, is_error: bool) -> Result<Value, JsonRpcError> {
    let result = CallToolResult {
        content: vec![Content::Text { text }],
        is_error: is_error.then_some(true),
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

/// Run a tool and wrap its output in an MCP result
pub async fn call_tool(
    tool: ConfluenceTool,
    arguments: Option<Value>,
    context: &ServerContext,
) -> Result<Value, JsonRpcError> {
    let arguments = arguments.unwrap_or_else(|| json!({}));

    if context.verbose {
        eprintln!("Calling {}: {}", tool.name(), arguments);
    }
    if tool.requires_write() {
        log::info!("{} requested: {arguments}", tool.name());
    }

    match execute(tool, &arguments, context).await {
        Ok(data) => {
            let text = serde_json::to_string_pretty(&data)
                .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?;
            text_result(text, false)
        }
        Err(ToolFailure::InvalidArguments(message)) => Err(JsonRpcError::invalid_params(message)),
        Err(ToolFailure::Rejected(message)) => {
            log::warn!("{} rejected: {message}", tool.name());
            error_result(message, tool, &arguments)
        }
        Err(ToolFailure::Gateway(err)) => {
            log::warn!(
                "{} failed (retryable: {}): {err}",
                tool.name(),
                err.is_retryable()
            );
            error_result(err.to_string(), tool, &arguments)
        }
    }
}

fn error_result(
    error: String,
    tool: ConfluenceTool,
    arguments: &Value,
) -> Result<Value, JsonRpcError> {
    let payload = ToolErrorPayload {
        error,
        operation: tool.name(),
        arguments,
    };
    let text = serde_json::to_string_pretty(&payload)
        .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?;
    text_result(text, true)
}

async fn execute(
    tool: ConfluenceTool,
    arguments: &Value,
    context: &ServerContext,
) -> Result<Value, ToolFailure> {
    let client = &context.client;

    match tool {
        ConfluenceTool::Ping => output(client.ping().await),
        ConfluenceTool::Whoami => output(client.whoami().await?),
        ConfluenceTool::ListSpaces => {
            let args: WindowArgs = parse(arguments)?;
            output(client.list_spaces(args.request()).await?)
        }
        ConfluenceTool::Search => {
            let args: SearchArgs = parse(arguments)?;
            output(
                client
                    .search(&args.cql, args.window.request(), args.expand.as_deref())
                    .await?,
            )
        }
        ConfluenceTool::GetPage => {
            let args: PageArgs = parse(arguments)?;
            output(client.get_page(&args.page_id, args.expand.as_deref()).await?)
        }
        ConfluenceTool::GetPageByTitle => {
            let args: TitleArgs = parse(arguments)?;
            output(
                client
                    .get_page_by_title(&args.space_key, &args.title, args.expand.as_deref())
                    .await?,
            )
        }
        ConfluenceTool::GetPageMetadata => {
            let args: PageArgs = parse(arguments)?;
            output(client.get_page_metadata(&args.page_id).await?)
        }
        ConfluenceTool::ListPages => {
            let args: SpacePagesArgs = parse(arguments)?;
            output(
                client
                    .list_pages(&args.space_key, args.window.request(), args.expand.as_deref())
                    .await?,
            )
        }
        ConfluenceTool::GetChildren => {
            let args: ChildrenArgs = parse(arguments)?;
            output(client.get_children(&args.page_id, args.window.request()).await?)
        }
        ConfluenceTool::CreatePage => {
            let args: CreateArgs = parse(arguments)?;
            context
                .policy
                .authorize(
                    WriteAction::CreatePage.as_str(),
                    Some(&args.space_key),
                    args.dry_run,
                )
                .map_err(Error::from)?;
            output(
                client
                    .create_page(
                        &args.space_key,
                        &args.title,
                        &args.body,
                        args.parent_id.as_deref(),
                        args.dry_run,
                    )
                    .await?,
            )
        }
        ConfluenceTool::UpdatePage => {
            let args: UpdateArgs = parse(arguments)?;
            let updates = PageUpdate {
                title: args.title,
                body: args.body,
                message: args.version_message,
            };
            if updates.is_empty() {
                return Err(ToolFailure::Rejected(
                    "Provide at least one of 'title' or 'body'".to_string(),
                ));
            }
            authorize_page_write(context, WriteAction::UpdatePage, &args.page_id, args.dry_run)
                .await?;
            output(
                client
                    .update_page(&args.page_id, &updates, args.dry_run)
                    .await?,
            )
        }
        ConfluenceTool::AddLabels => {
            let args: LabelArgs = parse(arguments)?;
            authorize_page_write(context, WriteAction::AddLabels, &args.page_id, args.dry_run)
                .await?;
            output(
                client
                    .add_labels(&args.page_id, &args.labels, args.dry_run)
                    .await?,
            )
        }
        ConfluenceTool::RemoveLabels => {
            let args: LabelArgs = parse(arguments)?;
            authorize_page_write(context, WriteAction::RemoveLabels, &args.page_id, args.dry_run)
                .await?;
            output(
                client
                    .remove_labels(&args.page_id, &args.labels, args.dry_run)
                    .await?,
            )
        }
        ConfluenceTool::ArchivePage => {
            let args: ArchiveArgs = parse(arguments)?;
            authorize_page_write(context, WriteAction::ArchivePage, &args.page_id, args.dry_run)
                .await?;
            output(client.archive_page(&args.page_id, args.dry_run).await?)
        }
        ConfluenceTool::AnalyzePage => {
            let args: PageArgs = parse(arguments)?;
            output(client.analyze_page(&args.page_id).await?)
        }
        ConfluenceTool::SuggestImprovements => {
            let args: PageArgs = parse(arguments)?;
            output(client.suggest_improvements(&args.page_id).await?)
        }
    }
}

/// Gate a write addressed by page id
///
/// With an allowlist configured the page's space is looked up first, so update, label and
/// archive calls are held to the same allowlist as create.
async fn authorize_page_write(
    context: &ServerContext,
    action: WriteAction,
    page_id: &str,
    dry_run: bool,
) -> Result<(), Error> {
    let policy = &context.policy;

    if dry_run || !policy.enabled || !policy.has_allowlist() {
        return Ok(policy.authorize(action.as_str(), None, dry_run)?);
    }

    let page = context.client.get_page_metadata(page_id).await?;
    policy.authorize(action.as_str(), Some(&page.space_key), dry_run)?;
    Ok(())
}
