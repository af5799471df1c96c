// file: src/deploy/mod.rs
// description: OpenShift deployment automation and manifest rendering
// reference: https://docs.openshift.com/container-platform/latest/cli_reference/openshift_cli/developer-cli-commands.html

pub mod manifests;
pub mod openshift;

pub use manifests::{DeploySettings, render_manifests};
pub use openshift::{
    CommandOutput, CommandRunner, DeployOptions, DeployReport, Deployer, StepAction, StepOutcome,
    SystemRunner,
};

use crate::config::Config;

/// Environment handed to the container, split into plain values and values
/// that belong in a Secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerEnv {
    pub plain: Vec<(String, String)>,
    pub secret: Vec<(String, String)>,
}

impl ContainerEnv {
    pub fn from_config(config: &Config) -> Self {
        let mut env = Self::default();

        env.push_plain("MODEL_ENDPOINT", Some(&config.model.endpoint));
        env.push_plain("MODEL_NAME", Some(&config.model.model));
        env.push_plain("ES_URL", Some(&config.elasticsearch.url));
        env.push_plain("ES_INDEX", Some(&config.elasticsearch.index));
        env.push_plain("ES_USERNAME", config.elasticsearch.username.as_ref());
        if config.elasticsearch.insecure_tls {
            env.push_plain("ES_INSECURE_TLS", Some(&"true".to_string()));
        }
        if config.mcp.enabled {
            env.push_plain("MCP_URL", config.mcp.url.as_ref());
        }
        env.push_plain("OTEL_SERVICE_NAME", config.telemetry.service_name.as_ref());
        env.push_plain(
            "OTEL_EXPORTER_OTLP_ENDPOINT",
            config.telemetry.otlp_endpoint.as_ref(),
        );
        env.push_plain(
            "OTEL_RESOURCE_ATTRIBUTES",
            config.telemetry.resource_attributes.as_ref(),
        );

        env.push_secret("ES_PASSWORD", config.elasticsearch.password.as_ref());
        env.push_secret("ES_API_KEY", config.elasticsearch.api_key.as_ref());
        env.push_secret("MODEL_API_KEY", config.model.api_key.as_ref());

        env
    }

    fn push_plain(&mut self, key: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.plain.push((key.to_string(), value.clone()));
        }
    }

    fn push_secret(&mut self, key: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.secret.push((key.to_string(), value.clone()));
        }
    }
}

/// Variables read from the credentials Secret by the Deployment.
pub const SECRET_KEYS: [&str; 3] = ["ES_PASSWORD", "ES_API_KEY", "MODEL_API_KEY"];

pub fn secret_name(app_name: &str) -> String {
    format!("{}-credentials", app_name)
}
