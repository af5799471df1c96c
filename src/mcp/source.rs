// file: src/mcp/source.rs
// description: log source that runs searches through an Elasticsearch MCP server
// reference: https://github.com/elastic/mcp-server-elasticsearch

use crate::config::{ElasticConfig, McpConfig};
use crate::error::{AgentError, Result};
use crate::mcp::client::{CallToolResult, McpClient};
use crate::models::{LogHit, SearchLogsInput, hits_from_search_response};
use crate::source::LogSource;
use crate::utils::{HealthCheck, OperationTimer};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct McpLogSource {
    client: McpClient,
    search_tool: String,
    index: String,
    result_size: usize,
    ready: Mutex<bool>,
}

impl McpLogSource {
    pub fn new(mcp: &McpConfig, elastic: &ElasticConfig) -> Result<Self> {
        let url = mcp
            .url
            .clone()
            .ok_or_else(|| AgentError::Config("MCP log source requires mcp.url".to_string()))?;

        Ok(Self {
            client: McpClient::new(url, Duration::from_secs(mcp.timeout_secs))?,
            search_tool: mcp.search_tool.clone(),
            index: elastic.index.clone(),
            result_size: elastic.result_size,
            ready: Mutex::new(false),
        })
    }

    pub fn client(&self) -> &McpClient {
        &self.client
    }

    /// Initializes the session and checks for the search tool, once per session.
    async fn ensure_session(&self) -> Result<()> {
        let mut ready = self.ready.lock().await;
        if *ready {
            return Ok(());
        }

        self.client.initialize().await?;
        let tools = self.client.list_tools().await?;
        info!("MCP server exposes {} tools", tools.len());
        if !tools.iter().any(|t| t.name == self.search_tool) {
            return Err(AgentError::Mcp(format!(
                "MCP server has no '{}' tool (available: {})",
                self.search_tool,
                tools
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        *ready = true;
        Ok(())
    }

    async fn reset_session(&self) {
        *self.ready.lock().await = false;
    }

    /// Calls the search tool, re-initializing once if the server dropped the session.
    async fn call_search(&self, arguments: Value) -> Result<CallToolResult> {
        match self.client.call_tool(&self.search_tool, arguments.clone()).await {
            Err(AgentError::McpSessionExpired) => {
                warn!("Re-initializing MCP session with {}", self.client.url());
                self.reset_session().await;
                self.ensure_session().await?;
                self.client.call_tool(&self.search_tool, arguments).await
            }
            other => other,
        }
    }
}

/// Converts a search tool result into hits. Text blocks holding a full search
/// response, a list of documents or a single document are parsed as JSON;
/// other non-empty blocks become message-only hits, except result count headers.
pub fn hits_from_tool_result(result: &CallToolResult) -> Vec<LogHit> {
    let mut hits = Vec::new();

    for text in result.texts() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) if value.get("hits").is_some() => {
                hits.extend(hits_from_search_response(&value));
            }
            Ok(Value::Array(items)) => {
                hits.extend(items.iter().map(document_hit));
            }
            Ok(value @ Value::Object(_)) => hits.push(document_hit(&value)),
            _ => {
                if trimmed.starts_with("Total results") {
                    continue;
                }
                hits.push(LogHit::new("No timestamp", trimmed));
            }
        }
    }

    hits
}

fn document_hit(doc: &Value) -> LogHit {
    if doc.get("_source").is_some() {
        LogHit::from_search_hit(doc)
    } else {
        LogHit::from_search_hit(&json!({ "_source": doc }))
    }
}

#[async_trait]
impl LogSource for McpLogSource {
    fn name(&self) -> &str {
        "elasticsearch-mcp"
    }

    async fn search(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>> {
        self.ensure_session().await?;

        let timer = OperationTimer::new("mcp search");
        let arguments = json!({
            "index": self.index,
            "queryBody": input.to_query_dsl(self.result_size)
        });

        debug!("Calling MCP tool {} for {}", self.search_tool, input.describe());
        let result = self.call_search(arguments).await?;

        if result.is_error {
            return Err(AgentError::Mcp(format!(
                "Tool {} reported an error: {}",
                self.search_tool,
                result.joined_text()
            )));
        }

        let mut hits = hits_from_tool_result(&result);
        hits.truncate(self.result_size);
        timer.finish();
        Ok(hits)
    }

    async fn health(&self) -> HealthCheck {
        let start = Instant::now();
        match self.ensure_session().await {
            Ok(()) => match self.client.list_tools().await {
                Ok(_) => HealthCheck::healthy(self.name(), start.elapsed()),
                Err(e) => {
                    if matches!(e, AgentError::McpSessionExpired) {
                        self.reset_session().await;
                    }
                    HealthCheck::degraded(self.name(), e.to_string(), start.elapsed())
                }
            },
            Err(e) => HealthCheck::unhealthy(self.name(), e.to_string(), start.elapsed()),
        }
    }
}
