mod cli;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use crate::atlassian::confluence::ConfluenceClient;
use crate::atlassian::ConfluenceConfig;
use crate::prelude::*;
use confluence_mcp_core::policy::WritePolicy;
use serde::{Deserialize, Serialize};

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// State shared by every request the server handles
///
/// Built once at startup; the gateway and the write policy are immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub client: ConfluenceClient,
    pub policy: WritePolicy,
    pub verbose: bool,
}

impl ServerContext {
    pub fn new(config: &ConfluenceConfig, verbose: bool) -> Result<Self> {
        Ok(Self {
            client: ConfluenceClient::new(config)?,
            policy: config.write_policy.clone(),
            verbose,
        })
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = ConfluenceConfig::from_env()?;
    let context = ServerContext::new(&config, global.verbose)?;

    log::info!(
        "serving {} (writes {}, allowed spaces: {:?})",
        config.base_url,
        if context.policy.enabled { "enabled" } else { "disabled" },
        context.policy.allowed_spaces
    );

    match app.command {
        cli::Commands::Stdio => stdio::run_stdio(context).await,
        cli::Commands::Sse(options) => sse::run_sse(options, context).await,
    }
}

/// Handle one JSON-RPC message; notifications produce no response
pub async fn handle_request(request_str: &str, context: &ServerContext) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                    data: None,
                }),
            });
        }
    };

    if request.id.is_none() && request.method.starts_with("notifications/") {
        log::debug!("notification {}", request.method);
        return None;
    }

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, context).await,
        method => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    Some(match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::confluence::testing::MockServer;
    use serde_json::{json, Value};

    fn context() -> ServerContext {
        ServerContext {
            client: MockServer::unreachable_client(),
            policy: WritePolicy::default(),
            verbose: false,
        }
    }

    async fn roundtrip(request: Value) -> Value {
        let response = handle_request(&request.to_string(), &context())
            .await
            .unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let response = roundtrip(json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" })).await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "confluence-mcp");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = handle_request("{not json", &context()).await.unwrap();
        let response = serde_json::to_value(response).unwrap();

        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = roundtrip(json!({ "jsonrpc": "2.0", "id": "a", "method": "resources/list" })).await;

        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let request = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });

        assert!(handle_request(&request.to_string(), &context()).await.is_none());
    }
}
