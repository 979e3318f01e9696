use serde::Deserialize;
use std::path::PathBuf;

use crate::orchestration::SubAgentConfig;

/// The TOML file structure for baton.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub general: Option<GeneralConfig>,
    pub limits: Option<LimitsConfig>,
    /// If specified, fully replaces agents from lower-priority layers.
    pub agents: Option<Vec<SubAgentConfig>>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub model: Option<String>,
    pub task_file: Option<String>,
    pub log_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    pub max_iterations: Option<usize>,
    pub max_tokens: Option<u32>,
    pub rpc_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let general = self.general;
        let limits = self.limits;
        PartialConfig {
            model: general.as_ref().and_then(|g| g.model.clone()),
            task_file: general
                .as_ref()
                .and_then(|g| g.task_file.as_ref().map(PathBuf::from)),
            log_dir: general
                .as_ref()
                .and_then(|g| g.log_dir.as_ref().map(PathBuf::from)),
            max_iterations: limits.as_ref().and_then(|l| l.max_iterations),
            max_tokens: limits.as_ref().and_then(|l| l.max_tokens),
            rpc_timeout_secs: limits.as_ref().and_then(|l| l.rpc_timeout_secs),
            max_retries: limits.as_ref().and_then(|l| l.max_retries),
            agents: self.agents,
        }
    }
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub max_iterations: usize,
    pub max_tokens: u32,
    pub rpc_timeout_secs: u64,
    pub max_retries: u32,
    pub task_file: PathBuf,
    pub log_dir: PathBuf,
    /// Empty means "use the built-in roster".
    pub agents: Vec<SubAgentConfig>,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    pub max_tokens: Option<u32>,
    pub rpc_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub task_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub agents: Option<Vec<SubAgentConfig>>,
}
