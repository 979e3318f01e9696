//! Multi-agent orchestration.
//!
//! Provides the [`registry::SubAgentRegistry`] of named agent personas, the
//! [`orchestrator::Orchestrator`] that plans, delegates, and synthesizes over
//! it, and the shared [`types`] they exchange.

pub mod orchestrator;
pub mod plan;
pub mod prompts;
pub mod registry;
pub mod types;

pub use orchestrator::{OrchestrationReport, Orchestrator, OrchestratorSettings};
pub use registry::{SubAgentDefaults, SubAgentRegistry};
pub use types::{ExecutionPlan, PlanStep, SubAgentConfig, SubAgentResult};
