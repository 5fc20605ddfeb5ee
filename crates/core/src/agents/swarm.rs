//! # Swarm Agent
//!
//! Swarming-stage agent. Generates one mission prompt per code unit and
//! announces each dispatched unit through the message coordinator so the
//! downstream spawner can schedule builder work.

use super::{Agent, AgentExecutionContext, AgentExecutionResult};
use crate::messaging::{BuilderNotificationMessage, MessageCoordinator};
use crate::models::{LlmClient, ModelConfig, SwarmConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Swarming-stage agent
pub struct SwarmAgent {
    llm: Arc<dyn LlmClient>,
    coordinator: Arc<dyn MessageCoordinator>,
    swarm_config: SwarmConfig,
    model_config: ModelConfig,
}

impl SwarmAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        coordinator: Arc<dyn MessageCoordinator>,
        swarm_config: SwarmConfig,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            llm,
            coordinator,
            swarm_config,
            model_config,
        }
    }

    /// Code units this stage should dispatch, from the stage parameters
    fn code_units(context: &AgentExecutionContext) -> Vec<String> {
        context
            .parameter("code_units")
            .and_then(|v| v.as_array())
            .map(|units| {
                units
                    .iter()
                    .filter_map(|u| u.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Agent for SwarmAgent {
    fn agent_type(&self) -> &'static str {
        "Swarm"
    }

    fn name(&self) -> &'static str {
        "Swarm Dispatcher"
    }

    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        let units = Self::code_units(context).len() as u64;
        30 + units * 10 + (context.input_prompt.len() as u64) / 300
    }

    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        let units = Self::code_units(context);

        tracing::info!(
            project = %context.project_id,
            units = units.len(),
            pool_size = self.swarm_config.max_pool_size,
            model = %self.model_config.model,
            "dispatching swarm missions"
        );

        let mut result = self.llm.generate(SYSTEM_PROMPT, context, cancel).await?;

        let invocation_id = crate::messaging::unique_id();
        for unit in &units {
            let message = BuilderNotificationMessage::dispatched(context, unit, &invocation_id);
            self.coordinator.send_notification(message, cancel).await?;
        }

        result
            .metadata
            .insert("dispatched_units".to_string(), serde_json::json!(units.len()));

        Ok(result)
    }
}

const SYSTEM_PROMPT: &str = include_str!("defaults/swarm.md");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryCoordinator, StaticLlm};

    #[tokio::test]
    async fn test_swarm_dispatches_one_notice_per_unit() {
        let coordinator = Arc::new(MemoryCoordinator::new());
        let agent = SwarmAgent::new(
            Arc::new(StaticLlm::succeeding("missions")),
            Arc::clone(&coordinator) as Arc<dyn MessageCoordinator>,
            SwarmConfig::default(),
            ModelConfig::default(),
        );

        let context = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1")
            .with_parameter("code_units", serde_json::json!(["UserService", "UserController"]));

        let result = agent.execute(&context, &CancellationToken::new()).await;
        assert!(result.success);
        assert_eq!(result.metadata["dispatched_units"], serde_json::json!(2));

        let notifications = coordinator.notifications();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].code_unit, "UserService");
        assert_eq!(notifications[0].status, "Dispatched");
    }

    #[tokio::test]
    async fn test_swarm_without_units_still_generates() {
        let coordinator = Arc::new(MemoryCoordinator::new());
        let agent = SwarmAgent::new(
            Arc::new(StaticLlm::succeeding("missions")),
            Arc::clone(&coordinator) as Arc<dyn MessageCoordinator>,
            SwarmConfig::default(),
            ModelConfig::default(),
        );

        let context = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1");
        let result = agent.execute(&context, &CancellationToken::new()).await;
        assert!(result.success);
        assert!(coordinator.notifications().is_empty());
    }
}
