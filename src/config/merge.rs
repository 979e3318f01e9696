use super::schema::{AppConfig, PartialConfig};
use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    /// For agents: REPLACE semantics (if self has Some, use it entirely).
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            max_iterations: self.max_iterations.or(fallback.max_iterations),
            max_tokens: self.max_tokens.or(fallback.max_tokens),
            rpc_timeout_secs: self.rpc_timeout_secs.or(fallback.rpc_timeout_secs),
            max_retries: self.max_retries.or(fallback.max_retries),
            task_file: self.task_file.or(fallback.task_file),
            log_dir: self.log_dir.or(fallback.log_dir),
            agents: self.agents.or(fallback.agents),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_iterations: self.max_iterations.unwrap_or(10),
            max_tokens: self.max_tokens.unwrap_or(4096),
            rpc_timeout_secs: self.rpc_timeout_secs.unwrap_or(120),
            max_retries: self.max_retries.unwrap_or(2),
            task_file: self.task_file.unwrap_or_else(|| PathBuf::from("./todos.json")),
            log_dir: self.log_dir.unwrap_or_else(|| PathBuf::from("./.baton-logs")),
            agents: self.agents.unwrap_or_default(),
        };

        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_iterations".into(),
                message: "must be at least 1".into(),
            });
        }
        if config.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens".into(),
                message: "must be at least 1".into(),
            });
        }
        if let Some(agent) = config.agents.iter().find(|a| a.name.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "agents.name".into(),
                message: format!("agent with role `{}` has an empty name", agent.role_prompt),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::SubAgentConfig;

    #[test]
    fn higher_layer_wins_field_by_field() {
        let cli = PartialConfig {
            model: Some("cli-model".into()),
            ..Default::default()
        };
        let file = PartialConfig {
            model: Some("file-model".into()),
            max_iterations: Some(4),
            ..Default::default()
        };
        let config = cli.with_fallback(file).finalize().unwrap();
        assert_eq!(config.model, "cli-model");
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn agents_are_replaced_not_merged() {
        let workspace = PartialConfig {
            agents: Some(vec![SubAgentConfig::new("a", "role a")]),
            ..Default::default()
        };
        let global = PartialConfig {
            agents: Some(vec![
                SubAgentConfig::new("b", "role b"),
                SubAgentConfig::new("c", "role c"),
            ]),
            ..Default::default()
        };
        let config = workspace.with_fallback(global).finalize().unwrap();
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].name, "a");
    }

    #[test]
    fn defaults_fill_everything() {
        let config = PartialConfig::default().finalize().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_retries, 2);
        assert!(config.agents.is_empty());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let partial = PartialConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            partial.finalize(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_iterations"
        ));
    }
}
