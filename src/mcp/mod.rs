// file: src/mcp/mod.rs
// description: MCP (Model Context Protocol) client for the Elasticsearch MCP server
// reference: https://modelcontextprotocol.io

pub mod client;
pub mod source;

pub use client::{CallToolResult, McpClient, McpTool, ToolContent};
pub use source::McpLogSource;
