// file: src/elastic/client.rs
// description: Elasticsearch REST client for log search and cluster inspection
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/rest-apis.html

use crate::config::ElasticConfig;
use crate::error::{AgentError, Result};
use crate::models::{LogHit, SearchLogsInput, hits_from_search_response};
use crate::source::LogSource;
use crate::utils::{HealthCheck, OperationTimer};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: String,
    #[serde(default)]
    pub number_of_nodes: u32,
    #[serde(default)]
    pub active_shards: u32,
    #[serde(default)]
    pub unassigned_shards: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}

#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    config: ElasticConfig,
}

impl ElasticsearchClient {
    pub fn new(config: ElasticConfig) -> Result<Self> {
        if config.insecure_tls {
            warn!("TLS certificate verification disabled for {}", config.url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| {
                AgentError::Elasticsearch(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            "Elasticsearch client ready for {} (index: {})",
            config.url, config.index
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(api_key) = &self.config.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(username) = &self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }

    async fn check_status(response: Response, action: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AgentError::Elasticsearch(format!(
            "{} failed with status {}: {}",
            action, status, body
        )))
    }

    pub async fn search_logs(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>> {
        let timer = OperationTimer::new("elasticsearch search");
        let body = input.to_query_dsl(self.config.result_size);

        debug!("Searching {} for {}", self.config.index, input.describe());

        let response = self
            .authorize(self.client.post(self.config.search_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Elasticsearch(format!("Search request failed: {}", e)))?;

        let response = Self::check_status(response, "Search").await?;
        let json: Value = response.json().await.map_err(|e| {
            AgentError::Elasticsearch(format!("Failed to parse search response: {}", e))
        })?;

        let hits = hits_from_search_response(&json);
        debug!("Search returned {} hits", hits.len());
        timer.finish();
        Ok(hits)
    }

    pub async fn cluster_health(&self) -> Result<ClusterHealth> {
        let response = self
            .authorize(self.client.get(self.url("_cluster/health")))
            .send()
            .await
            .map_err(|e| {
                AgentError::Elasticsearch(format!("Cluster health request failed: {}", e))
            })?;

        let response = Self::check_status(response, "Cluster health").await?;
        response.json().await.map_err(|e| {
            AgentError::Elasticsearch(format!("Failed to parse cluster health: {}", e))
        })
    }

    pub async fn list_indices(&self) -> Result<Vec<IndexInfo>> {
        let response = self
            .authorize(self.client.get(self.url("_cat/indices?format=json")))
            .send()
            .await
            .map_err(|e| AgentError::Elasticsearch(format!("Index listing failed: {}", e)))?;

        let response = Self::check_status(response, "Index listing").await?;
        let mut indices: Vec<IndexInfo> = response.json().await.map_err(|e| {
            AgentError::Elasticsearch(format!("Failed to parse index listing: {}", e))
        })?;
        indices.sort_by(|a, b| a.index.cmp(&b.index));
        Ok(indices)
    }
}

#[async_trait]
impl LogSource for ElasticsearchClient {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn search(&self, input: &SearchLogsInput) -> Result<Vec<LogHit>> {
        self.search_logs(input).await
    }

    async fn health(&self) -> HealthCheck {
        let start = Instant::now();
        match self.cluster_health().await {
            Ok(health) => match health.status.as_str() {
                "green" => HealthCheck::healthy(self.name(), start.elapsed()),
                "yellow" => HealthCheck::degraded(
                    self.name(),
                    format!("cluster {} status yellow", health.cluster_name),
                    start.elapsed(),
                ),
                other => HealthCheck::unhealthy(
                    self.name(),
                    format!("cluster {} status {}", health.cluster_name, other),
                    start.elapsed(),
                ),
            },
            Err(e) => HealthCheck::unhealthy(self.name(), e.to_string(), start.elapsed()),
        }
    }
}
