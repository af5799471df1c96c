// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod deploy;
pub mod elastic;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod utils;

pub use config::{Config, ElasticConfig, McpConfig, ModelConfig, ServerConfig, TelemetryConfig};
pub use deploy::{ContainerEnv, DeployOptions, DeploySettings, Deployer, SystemRunner};
pub use elastic::ElasticsearchClient;
pub use error::{AgentError, Result};
pub use llm::{ChatModel, OpenAiChatClient};
pub use mcp::{McpClient, McpLogSource};
pub use models::{LogHit, QueryRequest, QueryResponse, SearchLogsInput};
pub use pipeline::{Answer, QueryPipeline};
pub use source::LogSource;
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());

        let source = ElasticsearchClient::new(config.elasticsearch.clone()).unwrap();
        assert_eq!(source.name(), "elasticsearch");
    }

    #[test]
    fn test_pipeline_from_default_config() {
        let pipeline = QueryPipeline::from_config(&Config::default_config()).unwrap();
        assert_eq!(pipeline.source_name(), "elasticsearch");

        let err = tokio_test::block_on(pipeline.answer("   ")).unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }
}
