// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{AgentError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "LOG_AGENT";
const MAX_RESULT_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub elasticsearch: ElasticConfig,
    pub mcp: McpConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ElasticConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub index: String,
    pub result_size: usize,
    pub insecure_tls: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct McpConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub search_tool: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub resource_attributes: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 300,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1".to_string(),
            model: "gemma-tool-agent".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            api_key: None,
            index: "logs-*".to_string(),
            result_size: 5,
            insecure_tls: false,
            timeout_secs: 30,
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            search_tool: "search".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    /// Base URL of the OpenAI-compatible API, with a trailing
    /// `/v1/chat/completions` or `/chat/completions` removed.
    pub fn api_base(&self) -> String {
        let trimmed = self.endpoint.trim().trim_end_matches('/');
        let base = trimmed
            .strip_suffix("/v1/chat/completions")
            .or_else(|| trimmed.strip_suffix("/chat/completions"))
            .unwrap_or(trimmed);
        base.trim_end_matches('/').to_string()
    }

    fn versioned_base(&self) -> String {
        let base = self.api_base();
        if base.ends_with("/v1") {
            base
        } else {
            format!("{}/v1", base)
        }
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.versioned_base())
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.versioned_base())
    }
}

impl TelemetryConfig {
    pub fn service_name_or_default(&self) -> String {
        self.service_name
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
    }
}

impl ElasticConfig {
    pub fn search_url(&self) -> String {
        format!("{}/{}/_search", self.url.trim_end_matches('/'), self.index)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Same layering as `load`, reading environment variables from `env`
    /// instead of the process environment.
    pub fn load_with_env(path: Option<&Path>, env: config::Map<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                builder = builder
                    .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        let settings = builder
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        config.apply_env_overrides(|key| env.get(key).cloned())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Applies the flat variables a container deployment sets (`ES_URL`, `MODEL_ENDPOINT`, ...).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MODEL_ENDPOINT") {
            self.model.endpoint = v;
        }
        if let Some(v) = get("MODEL_NAME") {
            self.model.model = v;
        }
        if let Some(v) = get("MODEL_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = get("ES_URL") {
            self.elasticsearch.url = v;
        }
        if let Some(v) = get("ES_USERNAME") {
            self.elasticsearch.username = Some(v);
        }
        if let Some(v) = get("ES_PASSWORD") {
            self.elasticsearch.password = Some(v);
        }
        if let Some(v) = get("ES_API_KEY") {
            self.elasticsearch.api_key = Some(v);
        }
        if let Some(v) = get("ES_INDEX") {
            self.elasticsearch.index = v;
        }
        if let Some(v) = get("ES_INSECURE_TLS") {
            self.elasticsearch.insecure_tls = parse_bool("ES_INSECURE_TLS", &v)?;
        }
        if let Some(v) = get("MCP_URL") {
            self.mcp.url = Some(v);
            self.mcp.enabled = true;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| AgentError::Config(format!("PORT is not a valid port: {}", v)))?;
        }
        if let Some(v) = get("OTEL_SERVICE_NAME") {
            self.telemetry.service_name = Some(v);
        }
        if let Some(v) = get("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.telemetry.otlp_endpoint = Some(v);
        }
        if let Some(v) = get("OTEL_RESOURCE_ATTRIBUTES") {
            self.telemetry.resource_attributes = Some(v);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Validator::validate_url(&self.model.endpoint)
            .map_err(|e| AgentError::Config(format!("model.endpoint: {}", e)))?;
        Validator::validate_url(&self.elasticsearch.url)
            .map_err(|e| AgentError::Config(format!("elasticsearch.url: {}", e)))?;
        Validator::validate_port(self.server.port)
            .map_err(|e| AgentError::Config(format!("server.port: {}", e)))?;

        if self.elasticsearch.result_size == 0 || self.elasticsearch.result_size > MAX_RESULT_SIZE {
            return Err(AgentError::Config(format!(
                "elasticsearch.result_size must be between 1 and {}",
                MAX_RESULT_SIZE
            )));
        }

        if self.elasticsearch.index.trim().is_empty() {
            return Err(AgentError::Config(
                "elasticsearch.index must not be empty".to_string(),
            ));
        }

        if self.elasticsearch.username.is_some() != self.elasticsearch.password.is_some() {
            return Err(AgentError::Config(
                "elasticsearch username and password must be set together".to_string(),
            ));
        }

        if self.mcp.enabled {
            let url = self.mcp.url.as_deref().ok_or_else(|| {
                AgentError::Config("mcp.enabled requires mcp.url".to_string())
            })?;
            Validator::validate_url(url)
                .map_err(|e| AgentError::Config(format!("mcp.url: {}", e)))?;
        }

        Ok(())
    }

    /// Effective configuration with credentials masked, safe to log or print.
    pub fn redacted_summary(&self) -> String {
        format!(
            "Server:\n\
             - Listen: {}:{}\n\
             - Request timeout: {}s\n\
             \n\
             Model:\n\
             - Endpoint: {}\n\
             - Chat URL: {}\n\
             - Model: {}\n\
             - Temperature: {}\n\
             - API key: {}\n\
             \n\
             Elasticsearch:\n\
             - URL: {}\n\
             - Index: {}\n\
             - Result size: {}\n\
             - Username: {}\n\
             - Password: {}\n\
             - API key: {}\n\
             - Insecure TLS: {}\n\
             \n\
             MCP:\n\
             - Enabled: {}\n\
             - URL: {}\n\
             - Search tool: {}",
            self.server.host,
            self.server.port,
            self.server.request_timeout_secs,
            self.model.endpoint,
            self.model.chat_completions_url(),
            self.model.model,
            self.model.temperature,
            mask(&self.model.api_key),
            self.elasticsearch.url,
            self.elasticsearch.index,
            self.elasticsearch.result_size,
            self.elasticsearch.username.as_deref().unwrap_or("(none)"),
            mask(&self.elasticsearch.password),
            mask(&self.elasticsearch.api_key),
            self.elasticsearch.insecure_tls,
            self.mcp.enabled,
            self.mcp.url.as_deref().unwrap_or("(none)"),
            self.mcp.search_tool,
        )
    }
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "********",
        None => "(none)",
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AgentError::Config(format!(
            "{} is not a boolean: {}",
            key, other
        ))),
    }
}
