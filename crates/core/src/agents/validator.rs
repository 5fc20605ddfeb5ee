//! # Validator Agent
//!
//! Final agent in the pipeline. Reviews the build outcome against the
//! original specification and issues a verdict.

use super::{Agent, AgentExecutionContext, AgentExecutionResult};
use crate::models::{LlmClient, ModelConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Validating-stage agent
pub struct ValidatorAgent {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl ValidatorAgent {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl Agent for ValidatorAgent {
    fn agent_type(&self) -> &'static str {
        "Validator"
    }

    fn name(&self) -> &'static str {
        "Validator"
    }

    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        40 + (context.input_prompt.len() as u64) / 250
    }

    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        tracing::debug!(model = %self.config.model, "reviewing build outcome");
        self.llm.generate(SYSTEM_PROMPT, context, cancel).await
    }
}

const SYSTEM_PROMPT: &str = include_str!("defaults/validator.md");
