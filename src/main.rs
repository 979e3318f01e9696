use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use baton::agent::{LoopSettings, LoopStatus, ToolLoop, ToolRegistry};
use baton::cli::{Cli, Commands};
use baton::config::{self, AppConfig};
use baton::model::ModelClient;
use baton::model::genai_client::GenaiModelClient;
use baton::model::retry::{RetryPolicy, RetryingModelClient};
use baton::orchestration::prompts::default_agents;
use baton::orchestration::{Orchestrator, OrchestratorSettings, SubAgentDefaults, SubAgentRegistry};
use baton::tasks::display::render_task_list;
use baton::tasks::tools::TASK_AGENT_PROMPT;
use baton::tasks::{ConsoleTaskRenderer, JsonFilePersistence, TaskListStore, TaskStatusTool, TodoWriteTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr; stdout carries the answer)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let request = cli.command.request_text();

    let config = config::load_config(&cli).context("Failed to load configuration")?;
    tracing::info!(
        model = %config.model,
        max_iterations = config.max_iterations,
        task_file = %config.task_file.display(),
        "Config loaded"
    );

    let store = TaskListStore::open(Arc::new(JsonFilePersistence::new(&config.task_file)));

    match cli.command {
        Commands::Orchestrate { verbose, .. } => {
            let request = request.unwrap_or_default();
            let orchestrator = build_orchestrator(&config, &store);
            let cancel = cancel_on_ctrl_c();

            let report = tokio::select! {
                report = orchestrator.orchestrate_detailed(&request, Some(cancel.clone())) => report?,
                _ = cancel.cancelled() => anyhow::bail!("Interrupted"),
            };

            if verbose {
                eprintln!("Plan ({}):", if report.plan.parallel { "parallel" } else { "sequential" });
                for (step, result) in report.plan.steps.iter().zip(&report.results) {
                    let status = match &result.error {
                        Some(e) => format!("failed: {e}"),
                        None => format!("ok in {:.1}s", result.elapsed_secs),
                    };
                    eprintln!("  - {}: {} [{status}]", step.agent, step.prompt);
                }
            }
            println!("{}", report.answer);
        }
        Commands::Run { .. } => {
            let request = request.unwrap_or_default();
            store.subscribe(Arc::new(ConsoleTaskRenderer));
            let tools = task_tools(&store);
            let settings = LoopSettings {
                agent: "main".to_string(),
                model: config.model.clone(),
                system_prompt: TASK_AGENT_PROMPT.to_string(),
                max_iterations: config.max_iterations,
                max_tokens: config.max_tokens,
            };
            let tool_loop = ToolLoop::new(build_client(&config), settings)
                .with_log_dir(&config.log_dir)
                .with_cancellation(cancel_on_ctrl_c());

            let outcome = tool_loop.run(&request, &tools).await?;
            println!("{}", outcome.text());
            if outcome.status == LoopStatus::IterationCapExceeded {
                anyhow::bail!(
                    "Stopped after {} iterations while the model was still calling tools",
                    outcome.iterations
                );
            }
        }
        Commands::Agents => {
            let registry = build_registry(&config, &store);
            for agent in registry.configs() {
                let model = agent.model_override.as_deref().unwrap_or(&config.model);
                let tools = match &agent.allowed_tools {
                    None => "all tools".to_string(),
                    Some(t) if t.is_empty() => "no tools".to_string(),
                    Some(t) => t.join(", "),
                };
                println!("{} ({model}; {tools})", agent.name);
            }
        }
        Commands::Tasks => {
            let tasks = store.get_all();
            if tasks.is_empty() {
                println!("No tasks.");
            } else {
                println!("{}", render_task_list(&tasks, &store.stats()));
            }
        }
    }

    Ok(())
}

/// The production client: genai behind retry and per-call timeouts.
fn build_client(config: &AppConfig) -> Arc<dyn ModelClient> {
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        call_timeout: Duration::from_secs(config.rpc_timeout_secs),
        ..RetryPolicy::default()
    };
    Arc::new(RetryingModelClient::new(Arc::new(GenaiModelClient::default()), policy))
}

fn task_tools(store: &TaskListStore) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(TodoWriteTool::new(store.clone()))
        .with_tool(TaskStatusTool::new(store.clone()))
}

fn build_registry(config: &AppConfig, store: &TaskListStore) -> SubAgentRegistry {
    let defaults = SubAgentDefaults {
        model: config.model.clone(),
        max_iterations: config.max_iterations,
        max_tokens: config.max_tokens,
    };
    let registry = SubAgentRegistry::new(build_client(config), defaults, task_tools(store))
        .with_log_dir(&config.log_dir);

    let agents = if config.agents.is_empty() {
        default_agents()
    } else {
        config.agents.clone()
    };
    for agent in agents {
        registry.register(agent);
    }
    registry
}

fn build_orchestrator(config: &AppConfig, store: &TaskListStore) -> Orchestrator {
    let settings = OrchestratorSettings {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
    };
    Orchestrator::new(build_registry(config, store), settings)
}

/// A token cancelled on the first Ctrl+C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, cancelling");
            trigger.cancel();
        }
    });
    token
}
