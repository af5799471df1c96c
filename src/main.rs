// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use elastic_log_agent::deploy::{
    ContainerEnv, DeployOptions, DeploySettings, Deployer, SystemRunner, render_manifests,
};
use elastic_log_agent::models::{SearchLogsInput, render_hits};
use elastic_log_agent::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning,
};
use elastic_log_agent::utils::{SessionTracker, StageSpinner, Validator};
use elastic_log_agent::{Config, ElasticsearchClient, QueryPipeline, server};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const DEMO_QUESTION: &str = "Show me the most recent error logs";
const DEFAULT_APP: &str = "elastic-log-agent";
const DEFAULT_NAMESPACE: &str = "log-agent";

#[derive(Parser)]
#[command(name = "elastic_log_agent")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Answer questions about Elasticsearch logs with a hosted chat model", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single question and exit
    Ask {
        question: String,
    },

    /// Read questions from stdin until quit
    Interactive,

    /// Search logs directly without the model
    Search {
        query: String,

        #[arg(long, value_name = "DATE")]
        start: Option<String>,

        #[arg(long, value_name = "DATE")]
        end: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Check the log source and the model endpoint
    Health,

    /// List Elasticsearch indices with health and document counts
    Indices,

    /// Render OpenShift manifests
    Manifests {
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        #[arg(long, default_value = DEFAULT_APP)]
        app: String,

        #[arg(long)]
        image: Option<String>,
    },

    /// Build and roll out to OpenShift through the oc CLI
    Deploy {
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        #[arg(long, default_value = DEFAULT_APP)]
        app: String,

        #[arg(long, default_value = ".")]
        from_dir: PathBuf,

        #[arg(long)]
        skip_build: bool,
    },

    /// Show logs of the deployed application
    Logs {
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        #[arg(long, default_value = DEFAULT_APP)]
        app: String,

        #[arg(long, default_value_t = 100)]
        tail: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    elastic_log_agent::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    let config = if cli.config.exists() {
        info!("Loading configuration from: {}", cli.config.display());
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using defaults and environment",
            cli.config.display()
        );
        Config::load(None).context("Failed to load configuration")?
    };

    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(config, host, port).await?;
        }
        Commands::Ask { question } => {
            cmd_ask(&config, &question, cli.color).await?;
        }
        Commands::Interactive => {
            cmd_interactive(&config, cli.color).await?;
        }
        Commands::Search {
            query,
            start,
            end,
            limit,
        } => {
            cmd_search(config, query, start, end, limit).await?;
        }
        Commands::Health => {
            cmd_health(&config).await?;
        }
        Commands::Indices => {
            cmd_indices(&config).await?;
        }
        Commands::Manifests {
            output,
            namespace,
            app,
            image,
        } => {
            cmd_manifests(&config, output, &namespace, &app, image)?;
        }
        Commands::Deploy {
            namespace,
            app,
            from_dir,
            skip_build,
        } => {
            cmd_deploy(&config, namespace, app, from_dir, skip_build)?;
        }
        Commands::Logs {
            namespace,
            app,
            tail,
        } => {
            cmd_logs(&config, namespace, app, tail)?;
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Arc<QueryPipeline>> {
    let pipeline = QueryPipeline::from_config(config).context("Failed to build query pipeline")?;
    Ok(Arc::new(pipeline))
}

async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        Validator::validate_port(port)?;
        config.server.port = port;
    }

    info!("Elasticsearch log agent");
    info!("{}", config.redacted_summary());

    let pipeline = build_pipeline(&config)?;
    let service_name = config.telemetry.service_name_or_default();

    server::serve(&config.server, &service_name, pipeline)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

/// Draws nothing when stdout is redirected.
fn spinner(message: &str, colored: bool) -> StageSpinner {
    if std::io::stdout().is_terminal() {
        StageSpinner::new(message, colored)
    } else {
        StageSpinner::hidden()
    }
}

async fn cmd_ask(config: &Config, question: &str, colored: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let spinner = spinner("Analyzing logs", colored);
    let answer = pipeline.answer(question).await;
    spinner.finish();

    let answer = answer.context("Failed to answer question")?;
    println!("{}", answer.response);
    info!(
        "Answered from {} log entries ({}) in {} ms",
        answer.hits.len(),
        answer.search.describe(),
        answer.elapsed_ms
    );
    Ok(())
}

async fn cmd_interactive(config: &Config, colored: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let tracker = SessionTracker::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Elasticsearch log agent, interactive mode");
    println!("Type 'quit' or 'exit' to stop");

    loop {
        print!("\nquestion> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "stop") {
            break;
        }

        let question = if line.is_empty() {
            println!("{}", format_info(&format!("Running demo question: {}", DEMO_QUESTION)));
            DEMO_QUESTION
        } else {
            line
        };

        let spinner = spinner("Analyzing logs", colored);
        let result = pipeline.answer(question).await;
        spinner.finish();

        match result {
            Ok(answer) => {
                tracker.record_answer();
                println!("\n{}", answer.response);
            }
            Err(e) => {
                tracker.record_failure();
                println!("{}", format_error(&e.to_string()));
            }
        }
    }

    let stats = tracker.get_stats();
    println!(
        "\n{}",
        format_success(&format!(
            "{} answered, {} failed ({:.1}% success) in {}s",
            stats.questions_answered,
            stats.questions_failed,
            stats.success_rate(),
            stats.duration_secs
        ))
    );
    Ok(())
}

async fn cmd_search(
    mut config: Config,
    query: String,
    start: Option<String>,
    end: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    if let Some(limit) = limit {
        config.elasticsearch.result_size = limit;
        config.validate()?;
    }

    let mut input = SearchLogsInput::new(query);
    match (start, end) {
        (Some(start), Some(end)) => {
            let from = Validator::parse_timestamp(&start)
                .with_context(|| format!("Invalid start date: {}", start))?;
            let to = Validator::parse_range_end(&end)
                .with_context(|| format!("Invalid end date: {}", end))?;
            input = input.with_range(
                Validator::format_timestamp(&from),
                Validator::format_timestamp(&to),
            );
        }
        (None, None) => {}
        _ => warn!("Both --start and --end are needed for a time range, ignoring"),
    }

    let pipeline = build_pipeline(&config)?;
    info!("Searching {} for {}", pipeline.source_name(), input.describe());
    let hits = pipeline.search(&input).await.context("Log search failed")?;
    println!("{}", render_hits(&hits));
    Ok(())
}

async fn cmd_indices(config: &Config) -> Result<()> {
    let client = ElasticsearchClient::new(config.elasticsearch.clone())?;
    let indices = client.list_indices().await.context("Index listing failed")?;

    if indices.is_empty() {
        println!("{}", format_warning("No indices found"));
        return Ok(());
    }

    for index in &indices {
        println!(
            "{:<40} {:<8} {:>12} docs {:>10}",
            index.index,
            index.health.as_deref().unwrap_or("-"),
            index.docs_count.as_deref().unwrap_or("-"),
            index.store_size.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_health(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let report = pipeline.health().await;
    println!("{}", report.format());

    if !report.is_healthy() {
        anyhow::bail!("Service is unhealthy");
    }
    Ok(())
}

fn cmd_manifests(
    config: &Config,
    output: Option<PathBuf>,
    namespace: &str,
    app: &str,
    image: Option<String>,
) -> Result<()> {
    let mut settings = DeploySettings::new(app, namespace, ContainerEnv::from_config(config));
    settings.image = image;
    let yaml = render_manifests(&settings).context("Failed to render manifests")?;

    match output {
        Some(path) => {
            std::fs::write(&path, yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format_success(&format!("Wrote {}", path.display())));
        }
        None => println!("{}", yaml),
    }
    Ok(())
}

fn cmd_deploy(
    config: &Config,
    namespace: String,
    app: String,
    from_dir: PathBuf,
    skip_build: bool,
) -> Result<()> {
    let env = ContainerEnv::from_config(config);
    if env.secret.is_empty() {
        println!(
            "{}",
            format_warning("No credentials configured, the deployment will run without a Secret")
        );
    }

    let options = DeployOptions {
        namespace,
        app_name: app,
        from_dir,
        skip_build,
        env,
    };
    let deployer = Deployer::new(SystemRunner, options)?;
    let report = deployer.deploy().context("Deployment failed")?;

    let total = report.steps.len();
    for (i, step) in report.steps.iter().enumerate() {
        println!(
            "{}",
            format_step(i + 1, total, &format!("{}: {:?}", step.name, step.action))
        );
    }
    match report.url() {
        Some(url) => println!("{}", format_success(&format!("Available at {}", url))),
        None => println!("{}", format_warning("Deployed, but no route host was reported")),
    }
    Ok(())
}

fn cmd_logs(config: &Config, namespace: String, app: String, tail: usize) -> Result<()> {
    let options = DeployOptions {
        namespace,
        app_name: app,
        from_dir: PathBuf::from("."),
        skip_build: true,
        env: ContainerEnv::from_config(config),
    };
    let deployer = Deployer::new(SystemRunner, options)?;
    println!("{}", deployer.logs(tail)?);
    Ok(())
}
