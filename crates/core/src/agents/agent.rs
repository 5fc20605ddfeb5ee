//! # Agent Contract
//!
//! Every stage worker implements [`Agent`]. The lifecycle is fixed:
//! `pre_execute` → `execute_internal` → `post_execute`, wrapped by the
//! provided [`Agent::execute`] which contains faults and records duration.
//!
//! A defect inside one agent must never crash the stage: any error from the
//! hooks or the core work is converted into a failed [`AgentExecutionResult`].
//! Post-execution persistence failures are non-fatal; the work product is
//! more valuable than its bookkeeping.

use super::{AgentExecutionContext, AgentExecutionResult, StorageOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scheduling hint for the stage runner; not enforced by the agent itself
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A unit of stage work with a fixed lifecycle
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier used by the registry (e.g., "EnhancedBuilder")
    fn agent_type(&self) -> &'static str;

    /// Display name
    fn name(&self) -> &'static str;

    /// Scheduling hint
    fn priority(&self) -> Priority {
        Priority::Normal
    }

    /// Estimated duration in seconds; a pure function of context size
    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        30 + (context.input_prompt.len() as u64) / 256
    }

    /// Hook invoked before the core work; default no-op
    async fn pre_execute(&self, _context: &AgentExecutionContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// The variant-specific work
    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult>;

    /// Hook invoked after the core work; default no-op. Designer variants
    /// override this to persist output to secondary stores.
    async fn post_execute(
        &self,
        _context: &AgentExecutionContext,
        _result: &AgentExecutionResult,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Run the full lifecycle. Never propagates an error to the caller.
    async fn execute(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> AgentExecutionResult {
        let started = Instant::now();

        let mut result = match self.pre_execute(context).await {
            Ok(()) => match self.execute_internal(context, cancel).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(agent = self.agent_type(), error = %e, "agent execution failed");
                    AgentExecutionResult::failed(format!("{} failed: {:#}", self.name(), e))
                }
            },
            Err(e) => {
                tracing::warn!(agent = self.agent_type(), error = %e, "agent pre-execution failed");
                AgentExecutionResult::failed(format!("{} pre-execution failed: {:#}", self.name(), e))
            }
        };

        result.duration_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = self.post_execute(context, &result).await {
            tracing::warn!(
                agent = self.agent_type(),
                error = %e,
                "post-execution storage failed; result kept"
            );
            result.storage = StorageOutcome::Degraded {
                reason: e.to_string(),
            };
        }

        result
    }
}
