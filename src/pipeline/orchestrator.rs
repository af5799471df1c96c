// file: src/pipeline/orchestrator.rs
// description: coordinates question translation, log retrieval and summarization
// reference: orchestrates the asynchronous question answering workflow

use crate::config::Config;
use crate::elastic::ElasticsearchClient;
use crate::error::Result;
use crate::llm::{ChatModel, OpenAiChatClient};
use crate::mcp::McpLogSource;
use crate::models::{LogHit, SearchLogsInput};
use crate::pipeline::summarizer::Summarizer;
use crate::pipeline::translator::QueryTranslator;
use crate::source::LogSource;
use crate::utils::{HealthReport, OperationTimer, Validator};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

const SLOW_STAGE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub request_id: String,
    pub response: String,
    pub search: SearchLogsInput,
    pub hits: Vec<LogHit>,
    pub elapsed_ms: u64,
}

pub struct QueryPipeline {
    model: Arc<dyn ChatModel>,
    source: Arc<dyn LogSource>,
    translator: QueryTranslator,
    summarizer: Summarizer,
}

impl QueryPipeline {
    pub fn new(model: Arc<dyn ChatModel>, source: Arc<dyn LogSource>) -> Self {
        Self {
            translator: QueryTranslator::new(model.clone()),
            summarizer: Summarizer::new(model.clone()),
            model,
            source,
        }
    }

    /// Builds the pipeline against the configured model endpoint, retrieving
    /// through the MCP server when enabled and straight from Elasticsearch otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::new(config.model.clone())?);

        let source: Arc<dyn LogSource> = if config.mcp.enabled {
            Arc::new(McpLogSource::new(&config.mcp, &config.elasticsearch)?)
        } else {
            Arc::new(ElasticsearchClient::new(config.elasticsearch.clone())?)
        };

        info!(
            "Pipeline ready: model {} via {}, logs via {}",
            config.model.model,
            config.model.chat_completions_url(),
            source.name()
        );

        Ok(Self::new(model, source))
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = Validator::validate_question(question)?;
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("query", request_id = %request_id);

        self.run_stages(question, request_id)
            .instrument(span)
            .await
    }

    async fn run_stages(&self, question: &str, request_id: String) -> Result<Answer> {
        let start = Instant::now();
        info!("Processing question: {}", Validator::truncate_text(question, 200));

        let timer = OperationTimer::new("translate");
        let search = self.translator.translate(question).await?;
        timer.warn_if_slow(SLOW_STAGE, "query translation");
        timer.finish();
        info!("Searching {} for {}", self.source.name(), search.describe());

        let timer = OperationTimer::new("retrieve");
        let hits = self.source.search(&search).await?;
        timer.warn_if_slow(SLOW_STAGE, "log retrieval");
        timer.finish();
        info!("Retrieved {} log entries", hits.len());

        let timer = OperationTimer::new("summarize");
        let response = self.summarizer.summarize(question, &search, &hits).await?;
        timer.warn_if_slow(SLOW_STAGE, "summarization");
        timer.finish();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!("Answered in {} ms", elapsed_ms);

        Ok(Answer {
            request_id,
            response,
            search,
            hits,
            elapsed_ms,
        })
    }

    /// Runs a structured search without involving the model.
    pub async fn search(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>> {
        self.source.search(input).await
    }

    pub async fn health(&self) -> HealthReport {
        let (source, model) = futures::join!(self.source.health(), self.model.health());
        HealthReport::new(vec![source, model], env!("CARGO_PKG_VERSION").to_string())
    }
}
