//! # Stage Runner
//!
//! Executes one stage of a pipeline run: resolves the stage's agents from
//! the registry, runs them concurrently under the swarm pool bound, and
//! appends each result to the pipeline execution record. A stage timeout
//! cancels the shared token; every agent unwinds through its own
//! fault-containment path, so the runner never observes a raw fault.

use super::execution::ExecutionManager;
use super::stage::PipelineStage;
use crate::agents::{AgentExecutionContext, AgentExecutionResult, AgentRegistry};
use crate::models::SwarmConfig;
use crate::state::CrucibleDb;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs a stage's agents against a shared context
pub struct StageRunner {
    registry: Arc<AgentRegistry>,
    db: Arc<CrucibleDb>,
    config: SwarmConfig,
}

impl StageRunner {
    pub fn new(registry: Arc<AgentRegistry>, db: Arc<CrucibleDb>, config: SwarmConfig) -> Self {
        Self {
            registry,
            db,
            config,
        }
    }

    /// Run every agent mapped to `stage` and return their results
    ///
    /// An unmapped stage is a no-op, not a fault. Results are collected in
    /// completion order; no ordering is guaranteed between concurrently
    /// running agents.
    #[tracing::instrument(skip(self, context, cancel), fields(stage = stage.as_str(), project = %context.project_id))]
    pub async fn run_stage(
        &self,
        stage: PipelineStage,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<AgentExecutionResult>> {
        let agents = self.registry.agents_for_stage(stage.as_str());

        if agents.is_empty() {
            tracing::debug!("no agents mapped; stage is a no-op");
            return Ok(Vec::new());
        }

        let stage_cancel = cancel.child_token();
        let watchdog = self.config.stage_timeout_secs.map(|secs| {
            let token = stage_cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                tracing::warn!(timeout_secs = secs, "stage timeout; cancelling");
                token.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_pool_size.max(1)));
        let mut join_set = JoinSet::new();

        for agent in agents {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("agent pool semaphore closed")?;
            let ctx = context.clone();
            let token = stage_cancel.clone();

            join_set.spawn(async move {
                let _permit = permit; // Hold permit until the agent completes
                let agent_type = agent.agent_type();
                let result = agent.execute(&ctx, &token).await;
                (agent_type, result)
            });
        }

        let manager = ExecutionManager::new(&self.db);
        let mut results = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            let (agent_type, result) = match joined {
                Ok(pair) => pair,
                Err(e) => (
                    "unknown",
                    AgentExecutionResult::failed(format!("Agent task panicked: {}", e)),
                ),
            };

            // Result bookkeeping is non-fatal to the stage, same as any
            // other storage concern.
            if let Err(e) =
                manager.append_result(&context.pipeline_execution_id, agent_type, &result)
            {
                tracing::warn!(agent_type, error = %e, "failed to append result to execution");
            }

            results.push(result);
        }

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        tracing::info!(
            agents = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "stage finished"
        );

        Ok(results)
    }
}
