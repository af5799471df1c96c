// file: src/source.rs
// description: abstraction over where log hits are retrieved from
// reference: https://docs.rs/async-trait

use crate::error::Result;
use crate::models::{LogHit, SearchLogsInput};
use crate::utils::HealthCheck;
use async_trait::async_trait;

/// A backend able to run a structured log search.
///
/// Implemented by the direct Elasticsearch REST client and by the MCP client,
/// which forwards the same query body to an Elasticsearch MCP server.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Short name used in logs and health reports.
    fn name(&self) -> &str;

    async fn search(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>>;

    async fn health(&self) -> HealthCheck;
}
