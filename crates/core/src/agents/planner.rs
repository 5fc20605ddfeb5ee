//! # Planner Agent
//!
//! First agent in the pipeline. Turns the project specification into an
//! ordered implementation plan.

use super::{Agent, AgentExecutionContext, AgentExecutionResult, Priority};
use crate::models::{LlmClient, ModelConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Planning-stage agent
pub struct PlannerAgent {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn agent_type(&self) -> &'static str {
        "Planner"
    }

    fn name(&self) -> &'static str {
        "Planner"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        45 + (context.input_prompt.len() as u64) / 200
    }

    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        tracing::debug!(model = %self.config.model, "generating implementation plan");
        self.llm.generate(SYSTEM_PROMPT, context, cancel).await
    }
}

const SYSTEM_PROMPT: &str = include_str!("defaults/planner.md");
