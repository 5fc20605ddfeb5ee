//! # Designer Agent
//!
//! Turns the implementation plan into a technical design and persists the
//! output to the design store from its post-execution hook. Persistence
//! failures degrade the result's storage outcome; they never fail the agent.

use super::{Agent, AgentExecutionContext, AgentExecutionResult};
use crate::models::{LlmClient, ModelConfig};
use crate::state::{DesignOutput, DesignOutputStore};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Designing-stage agent
pub struct DesignerAgent {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn DesignOutputStore>,
    config: ModelConfig,
}

impl DesignerAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn DesignOutputStore>,
        config: ModelConfig,
    ) -> Self {
        Self { llm, store, config }
    }
}

#[async_trait]
impl Agent for DesignerAgent {
    fn agent_type(&self) -> &'static str {
        "Designer"
    }

    fn name(&self) -> &'static str {
        "Designer"
    }

    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        60 + (context.input_prompt.len() as u64) / 150
    }

    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        tracing::debug!(model = %self.config.model, "generating technical design");
        self.llm.generate(SYSTEM_PROMPT, context, cancel).await
    }

    async fn post_execute(
        &self,
        context: &AgentExecutionContext,
        result: &AgentExecutionResult,
    ) -> anyhow::Result<()> {
        if !result.success {
            return Ok(());
        }

        let output = DesignOutput::new(
            &context.project_id,
            &context.pipeline_execution_id,
            self.agent_type(),
            &result.output,
        )
        .with_scores(result.quality_score, result.confidence_score);

        self.store
            .save(&output)
            .await
            .context("Failed to persist design output")?;

        tracing::debug!(
            project = %context.project_id,
            design = %output.id,
            "design output persisted"
        );

        Ok(())
    }
}

const SYSTEM_PROMPT: &str = include_str!("defaults/designer.md");
