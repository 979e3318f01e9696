//! Registry of named sub-agents and single-prompt execution through one.
//!
//! [`SubAgentRegistry`] wraps its entries in `Arc<RwLock<..>>` so clones can
//! be handed to concurrently running branches. Registration is rare and
//! reads dominate.
//!
//! **Context isolation:** every [`execute`](SubAgentRegistry::execute) call
//! starts a fresh conversation containing only the given prompt. Nothing from
//! one execution is visible to another.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;

use super::types::SubAgentConfig;
use crate::agent::tool_loop::{LoopSettings, LoopStatus, ToolLoop};
use crate::agent::tools::ToolRegistry;
use crate::error::AgentError;
use crate::model::{ModelClient, ModelRequest};

/// Fallbacks for settings an agent does not override.
#[derive(Clone, Debug)]
pub struct SubAgentDefaults {
    pub model: String,
    pub max_iterations: usize,
    pub max_tokens: u32,
}

#[derive(Clone)]
pub struct SubAgentRegistry {
    agents: Arc<RwLock<Vec<SubAgentConfig>>>,
    client: Arc<dyn ModelClient>,
    defaults: SubAgentDefaults,
    tools: ToolRegistry,
    log_dir: Option<PathBuf>,
}

impl SubAgentRegistry {
    /// Create an empty registry. `tools` is the full set tool-enabled agents
    /// draw from.
    pub fn new(client: Arc<dyn ModelClient>, defaults: SubAgentDefaults, tools: ToolRegistry) -> Self {
        Self {
            agents: Arc::new(RwLock::new(Vec::new())),
            client,
            defaults,
            tools,
            log_dir: None,
        }
    }

    /// Write session logs for tool-enabled agents into `log_dir`.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Register an agent. An existing agent with the same name is replaced
    /// and keeps its position in [`list`](Self::list).
    pub fn register(&self, config: SubAgentConfig) {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        match agents.iter_mut().find(|a| a.name == config.name) {
            Some(existing) => {
                tracing::debug!(agent = %config.name, "Replacing sub-agent registration");
                *existing = config;
            }
            None => {
                tracing::debug!(agent = %config.name, "Registered sub-agent");
                agents.push(config);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<SubAgentConfig> {
        self.read().iter().find(|a| a.name == name).cloned()
    }

    /// Registered names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.read().iter().map(|a| a.name.clone()).collect()
    }

    /// Snapshot of every registered config in registration order.
    pub fn configs(&self) -> Vec<SubAgentConfig> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn client(&self) -> &Arc<dyn ModelClient> {
        &self.client
    }

    pub fn defaults(&self) -> &SubAgentDefaults {
        &self.defaults
    }

    /// Run `prompt` through the named agent and return its answer.
    pub async fn execute(&self, agent_name: &str, prompt: &str) -> Result<String, AgentError> {
        self.execute_with_cancel(agent_name, prompt, None).await
    }

    /// [`execute`](Self::execute), aborting with [`AgentError::Cancelled`]
    /// once `cancel` fires.
    pub async fn execute_with_cancel(
        &self,
        agent_name: &str,
        prompt: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<String, AgentError> {
        let config = self
            .get(agent_name)
            .ok_or_else(|| AgentError::AgentNotFound(agent_name.to_string()))?;
        let model = config
            .model_override
            .clone()
            .unwrap_or_else(|| self.defaults.model.clone());
        let tools = self.tools_for(&config);

        tracing::info!(agent = %config.name, model = %model, tools = tools.len(), "Executing sub-agent");

        if tools.is_empty() {
            let request = ModelRequest::one_shot(model, &config.role_prompt, prompt, self.defaults.max_tokens);
            let call = self.client.complete(request);
            let response = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(AgentError::Cancelled),
                    r = call => r?,
                },
                None => call.await?,
            };
            return Ok(response.first_text().unwrap_or_default().to_string());
        }

        let settings = LoopSettings {
            agent: config.name.clone(),
            model,
            system_prompt: config.role_prompt.clone(),
            max_iterations: self.defaults.max_iterations,
            max_tokens: self.defaults.max_tokens,
        };
        let mut tool_loop = ToolLoop::new(self.client.clone(), settings);
        if let Some(dir) = &self.log_dir {
            tool_loop = tool_loop.with_log_dir(dir.clone());
        }
        if let Some(token) = cancel {
            tool_loop = tool_loop.with_cancellation(token);
        }

        let outcome = tool_loop.run(prompt, &tools).await?;
        match outcome.status {
            LoopStatus::Completed => Ok(outcome.final_text.unwrap_or_default()),
            LoopStatus::IterationCapExceeded => Err(AgentError::IterationCap {
                agent: config.name,
                max_iterations: self.defaults.max_iterations,
            }),
        }
    }

    /// The subset of tools this agent may call.
    fn tools_for(&self, config: &SubAgentConfig) -> ToolRegistry {
        match &config.allowed_tools {
            None => self.tools.clone(),
            Some(names) => {
                let allowed: HashSet<String> = names.iter().cloned().collect();
                self.tools.filtered(&allowed)
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<SubAgentConfig>> {
        self.agents.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::{ContentBlock, ModelResponse, StopReason};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with its system prompt and remembers the models
    /// it was asked for.
    #[derive(Default)]
    struct EchoRole {
        models: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelClient for EchoRole {
        async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.models.lock().unwrap().push(request.model.clone());
            Ok(ModelResponse {
                content: vec![ContentBlock::text(request.system_prompt)],
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn registry(client: Arc<EchoRole>) -> SubAgentRegistry {
        let defaults = SubAgentDefaults {
            model: "default-model".into(),
            max_iterations: 3,
            max_tokens: 128,
        };
        SubAgentRegistry::new(client, defaults, ToolRegistry::new())
    }

    #[test]
    fn list_keeps_registration_order() {
        let reg = registry(Arc::new(EchoRole::default()));
        reg.register(SubAgentConfig::new("writer", "w"));
        reg.register(SubAgentConfig::new("critic", "c"));
        reg.register(SubAgentConfig::new("analyst", "a"));
        assert_eq!(reg.list(), vec!["writer", "critic", "analyst"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let reg = registry(Arc::new(EchoRole::default()));
        reg.register(SubAgentConfig::new("writer", "old"));
        reg.register(SubAgentConfig::new("critic", "c"));
        reg.register(SubAgentConfig::new("writer", "new"));
        assert_eq!(reg.list(), vec!["writer", "critic"]);
        assert_eq!(reg.get("writer").unwrap().role_prompt, "new");
    }

    #[test]
    fn clones_share_registrations() {
        let reg = registry(Arc::new(EchoRole::default()));
        let other = reg.clone();
        other.register(SubAgentConfig::new("late", "l"));
        assert!(reg.get("late").is_some());
    }

    #[tokio::test]
    async fn unknown_agent_is_an_error() {
        let reg = registry(Arc::new(EchoRole::default()));
        let err = reg.execute("nobody", "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::AgentNotFound(name) if name == "nobody"));
    }

    #[tokio::test]
    async fn execute_uses_role_prompt_and_model_fallback() {
        let client = Arc::new(EchoRole::default());
        let reg = registry(client.clone());
        reg.register(SubAgentConfig::new("plain", "Plain role."));
        reg.register(SubAgentConfig::new("fancy", "Fancy role.").with_model("fancy-model"));

        assert_eq!(reg.execute("plain", "hi").await.unwrap(), "Plain role.");
        assert_eq!(reg.execute("fancy", "hi").await.unwrap(), "Fancy role.");
        assert_eq!(*client.models.lock().unwrap(), vec!["default-model", "fancy-model"]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_execution() {
        let reg = registry(Arc::new(EchoRole::default()));
        reg.register(SubAgentConfig::new("plain", "p"));
        let token = CancellationToken::new();
        token.cancel();
        let err = reg.execute_with_cancel("plain", "hi", Some(token)).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }
}
