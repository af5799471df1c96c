// file: src/mcp/client.rs
// description: MCP client speaking JSON-RPC 2.0 over the Streamable HTTP transport
// reference: https://modelcontextprotocol.io/specification/2025-06-18/basic/transports

use crate::error::{AgentError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2025-06-18";
const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";
const MAX_SESSION_ID_LEN: usize = 256;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ToolsListResult {
    tools: Vec<McpTool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|c| match c {
            ToolContent::Text { text } => Some(text.as_str()),
            ToolContent::Other => None,
        })
    }

    pub fn joined_text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }
}

/// Extracts the `result` of the response with the given id from either a
/// plain JSON body or a `text/event-stream` body.
pub fn parse_rpc_body(body: &str, expected_id: u64) -> Result<Value> {
    if let Ok(rpc) = serde_json::from_str::<JsonRpcResponse>(body.trim()) {
        return into_result(rpc);
    }

    for line in body.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let Ok(rpc) = serde_json::from_str::<JsonRpcResponse>(data.trim()) else {
            continue;
        };
        let matches = match &rpc.id {
            Some(id) => id.as_u64() == Some(expected_id),
            None => false,
        };
        if matches {
            return into_result(rpc);
        }
    }

    Err(AgentError::Mcp(format!(
        "No JSON-RPC response with id {} found in body",
        expected_id
    )))
}

fn into_result(rpc: JsonRpcResponse) -> Result<Value> {
    if let Some(error) = rpc.error {
        return Err(AgentError::Mcp(format!(
            "JSON-RPC error {}: {}",
            error.code, error.message
        )));
    }
    rpc.result
        .ok_or_else(|| AgentError::Mcp("JSON-RPC response has no result".to_string()))
}

pub struct McpClient {
    client: Client,
    url: String,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Mcp(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.lock().await.clone()
    }

    async fn post(&self, payload: &JsonRpcRequest<'_>) -> RequestBuilder {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION)
            .json(payload);

        if let Some(sid) = self.session_id.lock().await.as_ref() {
            request = request.header(SESSION_HEADER, sid);
        }

        request
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };

        debug!("MCP request {} (id {})", method, id);

        let response = self
            .post(&payload)
            .await
            .send()
            .await
            .map_err(|e| AgentError::Mcp(format!("{} request failed: {}", method, e)))?;

        // a 404 on an established session means the server dropped it
        if response.status() == StatusCode::NOT_FOUND
            && self.session_id.lock().await.take().is_some()
        {
            warn!("MCP session expired during {}", method);
            return Err(AgentError::McpSessionExpired);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Mcp(format!(
                "{} failed with status {}: {}",
                method, status, body
            )));
        }

        if let Some(sid) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if sid.len() <= MAX_SESSION_ID_LEN && sid.is_ascii() {
                *self.session_id.lock().await = Some(sid.to_string());
            } else {
                warn!("Ignoring malformed MCP session id ({} bytes)", sid.len());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Mcp(format!("Failed to read {} response: {}", method, e)))?;

        parse_rpc_body(&body, id)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        };

        let response = self
            .post(&payload)
            .await
            .send()
            .await
            .map_err(|e| AgentError::Mcp(format!("{} notification failed: {}", method, e)))?;

        if response.status().is_client_error() {
            warn!(
                "MCP notification {} returned {}, session may be invalid",
                method,
                response.status()
            );
        }
        Ok(())
    }

    /// Performs the initialize handshake and stores the session id, if the server issues one.
    pub async fn initialize(&self) -> Result<Value> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await?;

        self.notify("notifications/initialized").await?;

        let server_name = result
            .get("serverInfo")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!("MCP session initialized with {} at {}", server_name, self.url);

        Ok(result)
    }

    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let result = self.request("tools/list", None).await?;
        let list: ToolsListResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let result = self
            .request(
                "tools/call",
                Some(json!({
                    "name": name,
                    "arguments": arguments
                })),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Ends the session on the server. Failures are logged, not returned.
    pub async fn close(&self) {
        let Some(sid) = self.session_id.lock().await.take() else {
            return;
        };

        let result = self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, &sid)
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION)
            .send()
            .await;

        if let Err(e) = result {
            debug!("MCP session cleanup failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_plain_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#;
        assert_eq!(parse_rpc_body(body, 3).unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn test_parse_sse_body_picks_matching_id() {
        let body = "event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n\
                    event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{\"tools\":[]}}\n\n";
        assert_eq!(parse_rpc_body(body, 7).unwrap(), json!({ "tools": [] }));
        assert!(parse_rpc_body(body, 8).is_err());
    }

    #[test]
    fn test_parse_rpc_error() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let err = parse_rpc_body(body, 1).unwrap_err();
        assert!(err.to_string().contains("-32601"));
        assert!(err.to_string().contains("Method not found"));
    }

    #[test]
    fn test_call_tool_result_text() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "first" },
                { "type": "image", "data": "...", "mimeType": "image/png" },
                { "type": "text", "text": "second" }
            ]
        }))
        .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.joined_text(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_handshake_keeps_session_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "initialize" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "session-abc")
                    .set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": { "serverInfo": { "name": "elasticsearch-mcp" } }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "notifications/initialized" })))
            .and(header("mcp-session-id", "session-abc"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .and(header("mcp-session-id", "session-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[{\"name\":\"search\",\"description\":\"Run a query\",\"inputSchema\":{\"type\":\"object\"}}]}}\n\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = McpClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        client.initialize().await.unwrap();
        assert_eq!(client.session_id().await.as_deref(), Some("session-abc"));

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search");
    }

    #[tokio::test]
    async fn test_http_error_is_mcp_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = McpClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, AgentError::Mcp(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_not_found_with_session_reports_expiry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "initialize" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "session-old")
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": {} })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "notifications/initialized" })))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .respond_with(ResponseTemplate::new(404).set_body_string("session not found"))
            .mount(&server)
            .await;

        let client = McpClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        client.initialize().await.unwrap();

        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, AgentError::McpSessionExpired));
        assert_eq!(client.session_id().await, None);

        // without a session a 404 is an ordinary failure
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, AgentError::Mcp(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_close_deletes_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("mcp-session-id", "session-xyz")
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "tools": [] } })),
            )
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(header("mcp-session-id", "session-xyz"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = McpClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(client.list_tools().await.unwrap().is_empty());

        client.close().await;
        assert_eq!(client.session_id().await, None);

        // no session left, so a second close sends nothing
        client.close().await;
    }
}
