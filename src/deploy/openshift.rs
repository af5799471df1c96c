// file: src/deploy/openshift.rs
// description: drives the oc CLI to build and roll out the agent with create-if-missing steps
// reference: https://docs.openshift.com/container-platform/latest/cli_reference/openshift_cli/getting-started-cli.html

use crate::deploy::{ContainerEnv, secret_name};
use crate::error::{AgentError, Result};
use crate::utils::Validator;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const OC: &str = "oc";
const LITERAL_FLAG: &str = "--from-literal=";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Executes an external program. Returns `Err` only when it cannot be started.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("Running {}", display_command(program, args));
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Command line as it may appear in logs, with literal values masked.
pub fn display_command(program: &str, args: &[String]) -> String {
    let masked: Vec<String> = args
        .iter()
        .map(|arg| match arg.strip_prefix(LITERAL_FLAG) {
            Some(pair) => {
                let key = pair.split('=').next().unwrap_or_default();
                format!("{}{}=********", LITERAL_FLAG, key)
            }
            None => arg.clone(),
        })
        .collect();
    format!("{} {}", program, masked.join(" "))
}

/// Writes `KEY=value` lines to a private temporary file for `--from-env-file`.
fn secret_env_file(pairs: &[(String, String)]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for (key, value) in pairs {
        writeln!(file, "{}={}", key, value)?;
    }
    file.flush()?;
    Ok(file)
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub namespace: String,
    pub app_name: String,
    pub from_dir: PathBuf,
    pub skip_build: bool,
    pub env: ContainerEnv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Created,
    Existing,
    Ran,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub name: String,
    pub action: StepAction,
}

#[derive(Debug, Clone, Default)]
pub struct DeployReport {
    pub steps: Vec<StepOutcome>,
    pub route_host: Option<String>,
}

impl DeployReport {
    fn record(&mut self, name: &str, action: StepAction) {
        info!("{}: {:?}", name, action);
        self.steps.push(StepOutcome {
            name: name.to_string(),
            action,
        });
    }

    pub fn action_for(&self, name: &str) -> Option<StepAction> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.action)
    }

    pub fn url(&self) -> Option<String> {
        self.route_host.as_ref().map(|h| format!("https://{}", h))
    }
}

pub struct Deployer<R: CommandRunner> {
    runner: R,
    options: DeployOptions,
}

impl<R: CommandRunner> Deployer<R> {
    pub fn new(runner: R, options: DeployOptions) -> Result<Self> {
        Validator::validate_resource_name(&options.namespace)?;
        Validator::validate_resource_name(&options.app_name)?;
        Ok(Self { runner, options })
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn oc(&self, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(OC, &args).map_err(|e| match e {
            AgentError::Io(io) if io.kind() == ErrorKind::NotFound => {
                AgentError::deploy("check-cli", "oc CLI not found in PATH")
            }
            other => other,
        })
    }

    fn oc_ns(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut full = args.to_vec();
        full.extend_from_slice(&["-n", &self.options.namespace]);
        self.oc(&full)
    }

    fn require(step: &str, output: CommandOutput) -> Result<CommandOutput> {
        if output.success {
            Ok(output)
        } else {
            let detail = if output.stderr.is_empty() {
                output.stdout.clone()
            } else {
                output.stderr.clone()
            };
            Err(AgentError::deploy(step, detail))
        }
    }

    fn exists(&self, resource: &str) -> Result<bool> {
        Ok(self.oc_ns(&["get", resource])?.success)
    }

    /// Confirms the CLI is installed and a session is active.
    pub fn preflight(&self) -> Result<String> {
        let version = self.oc(&["version", "--client"])?;
        if !version.success {
            return Err(AgentError::deploy("check-cli", "oc CLI not found in PATH"));
        }

        let whoami = self.oc(&["whoami"])?;
        if !whoami.success {
            return Err(AgentError::deploy(
                "check-login",
                "not logged in to a cluster, run `oc login` first",
            ));
        }

        Ok(whoami.stdout)
    }

    /// Builds and rolls out the application. Stops at the first failing step.
    pub fn deploy(&self) -> Result<DeployReport> {
        let mut report = DeployReport::default();
        let app = self.options.app_name.as_str();
        let ns = self.options.namespace.as_str();

        let user = self.preflight()?;
        info!("Deploying {} to {} as {}", app, ns, user);

        if self.oc(&["get", "project", ns])?.success {
            report.record("namespace", StepAction::Existing);
        } else {
            Self::require("new-project", self.oc(&["new-project", ns])?)?;
            report.record("namespace", StepAction::Created);
        }

        if self.exists(&format!("bc/{}", app))? {
            report.record("build-config", StepAction::Existing);
        } else {
            let name = format!("--name={}", app);
            Self::require(
                "new-build",
                self.oc_ns(&["new-build", &name, "--binary", "--strategy=docker"])?,
            )?;
            report.record("build-config", StepAction::Created);
        }

        if self.options.skip_build {
            report.record("build", StepAction::Skipped);
        } else {
            let from_dir = format!("--from-dir={}", self.options.from_dir.display());
            let output = Self::require(
                "start-build",
                self.oc_ns(&["start-build", app, &from_dir, "--follow"])?,
            )?;
            debug!("Build output:\n{}", output.stdout);
            report.record("build", StepAction::Ran);
        }

        if self.exists(&format!("deployment/{}", app))? {
            report.record("application", StepAction::Existing);
        } else {
            let image_stream = format!("--image-stream={}:latest", app);
            let name = format!("--name={}", app);
            Self::require("new-app", self.oc_ns(&["new-app", &image_stream, &name])?)?;
            report.record("application", StepAction::Created);
        }

        self.apply_env(&mut report)?;

        if self.exists(&format!("route/{}", app))? {
            report.record("route", StepAction::Existing);
        } else {
            Self::require("expose", self.oc_ns(&["expose", &format!("svc/{}", app)])?)?;
            Self::require(
                "route-tls",
                self.oc_ns(&[
                    "patch",
                    &format!("route/{}", app),
                    "--type=merge",
                    "-p",
                    r#"{"spec":{"tls":{"termination":"edge","insecureEdgeTerminationPolicy":"Redirect"}}}"#,
                ])?,
            )?;
            report.record("route", StepAction::Created);
        }

        Self::require(
            "rollout",
            self.oc_ns(&["rollout", "status", &format!("deployment/{}", app)])?,
        )?;
        report.record("rollout", StepAction::Ran);

        let host = self.oc_ns(&[
            "get",
            &format!("route/{}", app),
            "-o",
            "jsonpath={.spec.host}",
        ])?;
        if host.success && !host.stdout.is_empty() {
            report.route_host = Some(host.stdout);
        }

        Ok(report)
    }

    fn apply_env(&self, report: &mut DeployReport) -> Result<()> {
        let app = self.options.app_name.as_str();
        let deployment = format!("deployment/{}", app);
        let env = &self.options.env;

        if !env.secret.is_empty() {
            let secret = secret_name(app);
            if self.exists(&format!("secret/{}", secret))? {
                report.record("secret", StepAction::Existing);
            } else {
                let env_file = secret_env_file(&env.secret)?;
                let from_file = format!("--from-env-file={}", env_file.path().display());
                Self::require(
                    "create-secret",
                    self.oc_ns(&["create", "secret", "generic", &secret, &from_file])?,
                )?;
                report.record("secret", StepAction::Created);
            }

            let from = format!("--from=secret/{}", secret);
            Self::require("set-env", self.oc_ns(&["set", "env", &deployment, &from])?)?;
        }

        if env.plain.is_empty() {
            report.record("environment", StepAction::Skipped);
            return Ok(());
        }

        let pairs: Vec<String> = env.plain.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let mut args = vec!["set", "env", deployment.as_str()];
        args.extend(pairs.iter().map(String::as_str));
        Self::require("set-env", self.oc_ns(&args)?)?;
        report.record("environment", StepAction::Ran);
        Ok(())
    }

    /// Recent log output of the deployed application.
    pub fn logs(&self, tail: usize) -> Result<String> {
        self.preflight()?;
        let tail = format!("--tail={}", tail);
        let output = Self::require(
            "logs",
            self.oc_ns(&[
                "logs",
                &format!("deployment/{}", self.options.app_name),
                &tail,
            ])?,
        )?;
        Ok(output.stdout)
    }
}
