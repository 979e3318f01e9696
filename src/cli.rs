use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "baton", version, about = "Multi-agent orchestration with tool-using agents")]
pub struct Cli {
    /// Model for planning, synthesis, and agents without an override
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Path to config file (overrides ./baton.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum model responses per tool loop
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Task list JSON file
    #[arg(long, global = true)]
    pub task_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a request, delegate it to sub-agents, and synthesize the answer
    Orchestrate {
        /// The request, as free text
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,

        /// Print the plan and each agent's result before the answer
        #[arg(short, long)]
        verbose: bool,
    },
    /// Run a single agent with the task-list tools
    Run {
        /// The request, as free text
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },
    /// List registered sub-agents
    Agents,
    /// Show the current task list
    Tasks,
}

impl Commands {
    /// The free-text request, joined with spaces.
    pub fn request_text(&self) -> Option<String> {
        match self {
            Commands::Orchestrate { request, .. } | Commands::Run { request } => Some(request.join(" ")),
            Commands::Agents | Commands::Tasks => None,
        }
    }
}
