// file: src/deploy/manifests.rs
// description: renders the Deployment, Service and Route manifests as multi-document YAML
// reference: https://docs.rs/yaml-rust

use crate::deploy::{ContainerEnv, SECRET_KEYS, secret_name};
use crate::error::{AgentError, Result};
use crate::utils::Validator;
use yaml_rust::yaml::{Array, Hash};
use yaml_rust::{Yaml, YamlEmitter};

pub const CONTAINER_PORT: i64 = 8080;
pub const SERVICE_PORT: i64 = 80;

#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub app_name: String,
    pub namespace: String,
    pub image: Option<String>,
    pub replicas: i64,
    pub env: ContainerEnv,
}

impl DeploySettings {
    pub fn new(app_name: &str, namespace: &str, env: ContainerEnv) -> Self {
        Self {
            app_name: app_name.to_string(),
            namespace: namespace.to_string(),
            image: None,
            replicas: 1,
            env,
        }
    }

    /// Image pushed by the binary build into the namespace's ImageStream.
    pub fn image_ref(&self) -> String {
        self.image.clone().unwrap_or_else(|| {
            format!(
                "image-registry.openshift-image-registry.svc:5000/{}/{}:latest",
                self.namespace, self.app_name
            )
        })
    }
}

fn s(value: &str) -> Yaml {
    Yaml::String(value.to_string())
}

fn map(entries: Vec<(&str, Yaml)>) -> Yaml {
    let mut hash = Hash::new();
    for (key, value) in entries {
        hash.insert(s(key), value);
    }
    Yaml::Hash(hash)
}

fn list(items: Vec<Yaml>) -> Yaml {
    Yaml::Array(Array::from(items))
}

fn metadata(settings: &DeploySettings) -> Yaml {
    map(vec![
        ("name", s(&settings.app_name)),
        ("namespace", s(&settings.namespace)),
        ("labels", map(vec![("app", s(&settings.app_name))])),
    ])
}

fn env_list(settings: &DeploySettings) -> Yaml {
    let mut items: Vec<Yaml> = settings
        .env
        .plain
        .iter()
        .map(|(name, value)| map(vec![("name", s(name)), ("value", s(value))]))
        .collect();

    let secret = secret_name(&settings.app_name);
    items.extend(SECRET_KEYS.iter().map(|key| {
        map(vec![
            ("name", s(key)),
            (
                "valueFrom",
                map(vec![(
                    "secretKeyRef",
                    map(vec![
                        ("name", s(&secret)),
                        ("key", s(key)),
                        ("optional", Yaml::Boolean(true)),
                    ]),
                )]),
            ),
        ])
    }));

    list(items)
}

pub fn deployment(settings: &DeploySettings) -> Yaml {
    let labels = map(vec![("app", s(&settings.app_name))]);
    let health_check = map(vec![
        (
            "httpGet",
            map(vec![("path", s("/")), ("port", Yaml::Integer(CONTAINER_PORT))]),
        ),
        ("initialDelaySeconds", Yaml::Integer(5)),
        ("periodSeconds", Yaml::Integer(10)),
    ]);

    let container = map(vec![
        ("name", s(&settings.app_name)),
        ("image", s(&settings.image_ref())),
        ("imagePullPolicy", s("Always")),
        (
            "ports",
            list(vec![map(vec![
                ("containerPort", Yaml::Integer(CONTAINER_PORT)),
                ("protocol", s("TCP")),
            ])]),
        ),
        ("env", env_list(settings)),
        ("readinessProbe", health_check.clone()),
        ("livenessProbe", health_check),
    ]);

    map(vec![
        ("apiVersion", s("apps/v1")),
        ("kind", s("Deployment")),
        ("metadata", metadata(settings)),
        (
            "spec",
            map(vec![
                ("replicas", Yaml::Integer(settings.replicas)),
                ("selector", map(vec![("matchLabels", labels.clone())])),
                (
                    "template",
                    map(vec![
                        ("metadata", map(vec![("labels", labels)])),
                        ("spec", map(vec![("containers", list(vec![container]))])),
                    ]),
                ),
            ]),
        ),
    ])
}

pub fn service(settings: &DeploySettings) -> Yaml {
    map(vec![
        ("apiVersion", s("v1")),
        ("kind", s("Service")),
        ("metadata", metadata(settings)),
        (
            "spec",
            map(vec![
                ("selector", map(vec![("app", s(&settings.app_name))])),
                (
                    "ports",
                    list(vec![map(vec![
                        ("name", s("http")),
                        ("port", Yaml::Integer(SERVICE_PORT)),
                        ("targetPort", Yaml::Integer(CONTAINER_PORT)),
                        ("protocol", s("TCP")),
                    ])]),
                ),
            ]),
        ),
    ])
}

pub fn route(settings: &DeploySettings) -> Yaml {
    map(vec![
        ("apiVersion", s("route.openshift.io/v1")),
        ("kind", s("Route")),
        ("metadata", metadata(settings)),
        (
            "spec",
            map(vec![
                (
                    "to",
                    map(vec![("kind", s("Service")), ("name", s(&settings.app_name))]),
                ),
                ("port", map(vec![("targetPort", s("http"))])),
                (
                    "tls",
                    map(vec![
                        ("termination", s("edge")),
                        ("insecureEdgeTerminationPolicy", s("Redirect")),
                    ]),
                ),
            ]),
        ),
    ])
}

/// Deployment, Service and Route as one YAML stream, ready for `oc apply -f -`.
pub fn render_manifests(settings: &DeploySettings) -> Result<String> {
    Validator::validate_resource_name(&settings.app_name)?;
    Validator::validate_resource_name(&settings.namespace)?;

    let mut documents = Vec::new();
    for doc in [deployment(settings), service(settings), route(settings)] {
        let mut out = String::new();
        YamlEmitter::new(&mut out)
            .dump(&doc)
            .map_err(|e| AgentError::deploy("render manifests", format!("{:?}", e)))?;
        documents.push(out);
    }

    Ok(documents.join("\n") + "\n")
}
