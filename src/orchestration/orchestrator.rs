//! Plan → execute → synthesize over a [`SubAgentRegistry`].
//!
//! **Failure model:** a planning RPC failure or an unparseable plan aborts
//! the call, as does a synthesis RPC failure. Per-step failures (unknown
//! agent, model error, iteration cap, cancellation) are captured in that
//! step's [`SubAgentResult::error`] and handed to synthesis.
//!
//! **Concurrency model:** [`Orchestrator::delegate_parallel`] is the only
//! fan-out point. It spawns one task per step into a `JoinSet` and waits for
//! every branch before returning. Each branch owns its conversation and
//! writes only to its own input-indexed slot.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::plan::parse_plan;
use super::prompts::{SYNTHESIZER_PROMPT, build_planner_prompt, build_synthesis_message};
use super::registry::SubAgentRegistry;
use super::types::{ExecutionPlan, PlanStep, SubAgentResult};
use crate::error::OrchestrationError;
use crate::model::{ModelClient, ModelRequest, complete_text};

/// Model settings for the planning and synthesis requests.
#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    pub model: String,
    pub max_tokens: u32,
}

/// Everything an orchestration produced.
#[derive(Clone, Debug, Serialize)]
pub struct OrchestrationReport {
    pub plan: ExecutionPlan,
    pub results: Vec<SubAgentResult>,
    pub answer: String,
}

pub struct Orchestrator {
    registry: SubAgentRegistry,
    client: Arc<dyn ModelClient>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Uses the registry's model client for planning and synthesis.
    pub fn new(registry: SubAgentRegistry, settings: OrchestratorSettings) -> Self {
        let client = registry.client().clone();
        Self {
            registry,
            client,
            settings,
        }
    }

    pub fn registry(&self) -> &SubAgentRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Delegation
    // -----------------------------------------------------------------------

    /// Run steps one at a time, in order. A failed step does not stop later
    /// ones.
    pub async fn delegate_sequential(&self, steps: &[PlanStep]) -> Vec<SubAgentResult> {
        self.delegate_sequential_with_cancel(steps, None).await
    }

    pub async fn delegate_sequential_with_cancel(
        &self,
        steps: &[PlanStep],
        cancel: Option<CancellationToken>,
    ) -> Vec<SubAgentResult> {
        let mut results = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            tracing::debug!(step = i + 1, agent = %step.agent, "Running step");
            results.push(run_step(&self.registry, step, cancel.clone()).await);
        }
        results
    }

    /// Run all steps concurrently and return results in input order once
    /// every branch has settled.
    pub async fn delegate_parallel(&self, steps: &[PlanStep]) -> Vec<SubAgentResult> {
        self.delegate_parallel_with_cancel(steps, None).await
    }

    /// [`delegate_parallel`](Self::delegate_parallel) with a token shared by
    /// all branches. Cancelled branches report `error = "Cancelled"`.
    pub async fn delegate_parallel_with_cancel(
        &self,
        steps: &[PlanStep],
        cancel: Option<CancellationToken>,
    ) -> Vec<SubAgentResult> {
        let mut branches = JoinSet::new();
        for (index, step) in steps.iter().cloned().enumerate() {
            let registry = self.registry.clone();
            let cancel = cancel.clone();
            branches.spawn(async move { (index, run_step(&registry, &step, cancel).await) });
        }

        let mut slots: Vec<Option<SubAgentResult>> = vec![None; steps.len()];
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Delegated branch did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(steps)
            .map(|(slot, step)| {
                slot.unwrap_or_else(|| SubAgentResult::failure(&step.agent, "branch did not complete", 0.0))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Orchestration phases
    // -----------------------------------------------------------------------

    /// Ask the model for a plan over the registered agents.
    pub async fn plan(&self, user_request: &str) -> Result<ExecutionPlan, OrchestrationError> {
        let agents = self.registry.configs();
        if agents.is_empty() {
            return Err(OrchestrationError::NoAgents);
        }

        let request = ModelRequest::one_shot(
            &self.settings.model,
            build_planner_prompt(&agents),
            user_request,
            self.settings.max_tokens,
        );
        let raw = complete_text(self.client.as_ref(), request)
            .await
            .map_err(OrchestrationError::Planning)?;

        let plan = parse_plan(&raw).inspect_err(|e| {
            tracing::error!(error = %e, "Planner reply could not be parsed");
        })?;
        tracing::info!(steps = plan.steps.len(), parallel = plan.parallel, "Plan ready");
        Ok(plan)
    }

    /// Run a plan: parallel only when requested and there is more than one
    /// step.
    pub async fn execute_plan(&self, plan: &ExecutionPlan, cancel: Option<CancellationToken>) -> Vec<SubAgentResult> {
        if plan.parallel && plan.steps.len() > 1 {
            self.delegate_parallel_with_cancel(&plan.steps, cancel).await
        } else {
            self.delegate_sequential_with_cancel(&plan.steps, cancel).await
        }
    }

    /// Ask the model for one consolidated answer. Returned verbatim.
    pub async fn synthesize(
        &self,
        user_request: &str,
        results: &[SubAgentResult],
    ) -> Result<String, OrchestrationError> {
        let request = ModelRequest::one_shot(
            &self.settings.model,
            SYNTHESIZER_PROMPT,
            build_synthesis_message(user_request, results),
            self.settings.max_tokens,
        );
        complete_text(self.client.as_ref(), request)
            .await
            .map_err(OrchestrationError::Synthesis)
    }

    /// Plan, execute, and synthesize; returns the final answer.
    pub async fn orchestrate(&self, user_request: &str) -> Result<String, OrchestrationError> {
        Ok(self.orchestrate_detailed(user_request, None).await?.answer)
    }

    /// [`orchestrate`](Self::orchestrate), also returning the plan and every
    /// step result.
    pub async fn orchestrate_detailed(
        &self,
        user_request: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<OrchestrationReport, OrchestrationError> {
        let plan = self.plan(user_request).await?;
        let results = self.execute_plan(&plan, cancel).await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            tracing::warn!(failed, total = results.len(), "Some delegated steps failed");
        }

        let answer = self.synthesize(user_request, &results).await?;
        Ok(OrchestrationReport {
            plan,
            results,
            answer,
        })
    }
}

/// Execute one step, folding any error into the result.
async fn run_step(registry: &SubAgentRegistry, step: &PlanStep, cancel: Option<CancellationToken>) -> SubAgentResult {
    let start = Instant::now();
    let outcome = registry.execute_with_cancel(&step.agent, &step.prompt, cancel).await;
    let elapsed = start.elapsed().as_secs_f64();
    match outcome {
        Ok(output) => SubAgentResult::success(&step.agent, output, elapsed),
        Err(e) => {
            tracing::warn!(agent = %step.agent, error = %e, "Delegated step failed");
            SubAgentResult::failure(&step.agent, e.to_string(), elapsed)
        }
    }
}
