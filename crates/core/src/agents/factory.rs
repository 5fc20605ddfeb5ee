//! # Agent Registry
//!
//! Resolves agent-type identifiers to constructed agents and stage names to
//! ordered agent sets. Each variant registers with a declared capability
//! set; resolution checks that shape before construction, so adding a
//! variant with a new dependency shape never touches call sites.
//!
//! The registry is an explicit object scoped to its owner's lifetime; there
//! are no process-wide dispatch tables.

use super::{
    Agent, DesignerAgent, EnhancedBuilderAgent, PlannerAgent, SwarmAgent, ValidatorAgent,
};
use crate::build::{BuildExecutor, DocumentAggregator};
use crate::messaging::MessageCoordinator;
use crate::models::{LlmClient, ModelConfig, SwarmConfig};
use crate::state::DesignOutputStore;
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capabilities an agent variant may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Model invocation
    Llm,
    /// Designer output persistence
    DesignStore,
    /// Builder message delivery
    Messaging,
    /// Swarm configuration
    SwarmConfig,
    /// Document aggregation
    Aggregation,
    /// Build execution
    BuildExecution,
}

/// The capability bundle agents are constructed from
#[derive(Default)]
pub struct Capabilities {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub design_store: Option<Arc<dyn DesignOutputStore>>,
    pub coordinator: Option<Arc<dyn MessageCoordinator>>,
    pub swarm_config: Option<SwarmConfig>,
    pub aggregator: Option<Arc<dyn DocumentAggregator>>,
    pub build_executor: Option<Arc<dyn BuildExecutor>>,
    /// Model selection for LLM-backed variants; defaults when absent
    pub model_config: Option<ModelConfig>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_design_store(mut self, store: Arc<dyn DesignOutputStore>) -> Self {
        self.design_store = Some(store);
        self
    }

    pub fn with_coordinator(mut self, coordinator: Arc<dyn MessageCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn with_swarm_config(mut self, config: SwarmConfig) -> Self {
        self.swarm_config = Some(config);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn DocumentAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_build_executor(mut self, executor: Arc<dyn BuildExecutor>) -> Self {
        self.build_executor = Some(executor);
        self
    }

    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = Some(config);
        self
    }

    /// The model config to construct LLM-backed variants with
    fn model_config(&self) -> ModelConfig {
        self.model_config.clone().unwrap_or_default()
    }

    /// Whether a capability is registered
    pub fn provides(&self, capability: Capability) -> bool {
        match capability {
            Capability::Llm => self.llm.is_some(),
            Capability::DesignStore => self.design_store.is_some(),
            Capability::Messaging => self.coordinator.is_some(),
            Capability::SwarmConfig => self.swarm_config.is_some(),
            Capability::Aggregation => self.aggregator.is_some(),
            Capability::BuildExecution => self.build_executor.is_some(),
        }
    }
}

/// Errors from agent resolution
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),
    #[error("agent type {agent_type} requires capability {capability:?}, which is not registered")]
    MissingCapability {
        agent_type: String,
        capability: Capability,
    },
    #[error("failed to construct agent {agent_type}")]
    Construction {
        agent_type: String,
        #[source]
        source: anyhow::Error,
    },
}

type ConstructorFn = Box<dyn Fn(&Capabilities) -> anyhow::Result<Arc<dyn Agent>> + Send + Sync>;

struct Registration {
    requires: &'static [Capability],
    construct: ConstructorFn,
}

/// Closed registry of agent variants and stage compositions
pub struct AgentRegistry {
    capabilities: Capabilities,
    registrations: HashMap<String, Registration>,
    stages: HashMap<String, Vec<String>>,
}

impl AgentRegistry {
    /// Create an empty registry over a capability bundle
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            registrations: HashMap::new(),
            stages: HashMap::new(),
        }
    }

    /// Register a variant with its declared capability set
    pub fn register<F>(
        &mut self,
        agent_type: impl Into<String>,
        requires: &'static [Capability],
        construct: F,
    ) where
        F: Fn(&Capabilities) -> anyhow::Result<Arc<dyn Agent>> + Send + Sync + 'static,
    {
        self.registrations.insert(
            agent_type.into(),
            Registration {
                requires,
                construct: Box::new(construct),
            },
        );
    }

    /// Map a stage name to its ordered agent types
    pub fn map_stage(&mut self, stage: impl Into<String>, agent_types: &[&str]) {
        self.stages.insert(
            stage.into(),
            agent_types.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// All registered agent type identifiers
    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.registrations.keys().map(|s| s.as_str()).collect();
        types.sort();
        types
    }

    /// Resolve one agent type to a constructed agent
    pub fn resolve(&self, agent_type: &str) -> Result<Arc<dyn Agent>, FactoryError> {
        let registration = self
            .registrations
            .get(agent_type)
            .ok_or_else(|| FactoryError::UnknownAgentType(agent_type.to_string()))?;

        for capability in registration.requires {
            if !self.capabilities.provides(*capability) {
                return Err(FactoryError::MissingCapability {
                    agent_type: agent_type.to_string(),
                    capability: *capability,
                });
            }
        }

        (registration.construct)(&self.capabilities).map_err(|source| FactoryError::Construction {
            agent_type: agent_type.to_string(),
            source,
        })
    }

    /// Resolve a stage name to its ordered, constructed agents
    ///
    /// An unknown stage is a no-op stage, not a fault. A variant that fails
    /// to construct is logged and skipped; the caller decides whether a
    /// thinner stage is acceptable.
    pub fn agents_for_stage(&self, stage: &str) -> Vec<Arc<dyn Agent>> {
        let Some(agent_types) = self.stages.get(stage) else {
            return Vec::new();
        };

        let mut agents = Vec::with_capacity(agent_types.len());
        for agent_type in agent_types {
            match self.resolve(agent_type) {
                Ok(agent) => agents.push(agent),
                Err(e) => {
                    tracing::warn!(stage, agent_type = %agent_type, error = %e, "no agent produced");
                }
            }
        }
        agents
    }
}

/// Build the standard registry: five variants across five stages
pub fn default_registry(capabilities: Capabilities) -> AgentRegistry {
    let mut registry = AgentRegistry::new(capabilities);

    registry.register("Planner", &[Capability::Llm], |caps| {
        let llm = caps.llm.clone().context("llm capability missing")?;
        Ok(Arc::new(PlannerAgent::new(llm, caps.model_config())) as Arc<dyn Agent>)
    });

    registry.register(
        "Designer",
        &[Capability::Llm, Capability::DesignStore],
        |caps| {
            let llm = caps.llm.clone().context("llm capability missing")?;
            let store = caps
                .design_store
                .clone()
                .context("design store capability missing")?;
            Ok(Arc::new(DesignerAgent::new(llm, store, caps.model_config())) as Arc<dyn Agent>)
        },
    );

    registry.register(
        "Swarm",
        &[Capability::Llm, Capability::Messaging, Capability::SwarmConfig],
        |caps| {
            let llm = caps.llm.clone().context("llm capability missing")?;
            let coordinator = caps
                .coordinator
                .clone()
                .context("messaging capability missing")?;
            let config = caps
                .swarm_config
                .clone()
                .context("swarm config capability missing")?;
            Ok(Arc::new(SwarmAgent::new(llm, coordinator, config, caps.model_config()))
                as Arc<dyn Agent>)
        },
    );

    registry.register(
        "EnhancedBuilder",
        &[
            Capability::Aggregation,
            Capability::Messaging,
            Capability::BuildExecution,
        ],
        |caps| {
            let aggregator = caps
                .aggregator
                .clone()
                .context("aggregation capability missing")?;
            let executor = caps
                .build_executor
                .clone()
                .context("build execution capability missing")?;
            let coordinator = caps
                .coordinator
                .clone()
                .context("messaging capability missing")?;
            Ok(Arc::new(EnhancedBuilderAgent::new(aggregator, executor, coordinator))
                as Arc<dyn Agent>)
        },
    );

    registry.register("Validator", &[Capability::Llm], |caps| {
        let llm = caps.llm.clone().context("llm capability missing")?;
        Ok(Arc::new(ValidatorAgent::new(llm, caps.model_config())) as Arc<dyn Agent>)
    });

    registry.map_stage("Planning", &["Planner"]);
    registry.map_stage("Designing", &["Designer"]);
    registry.map_stage("Swarming", &["Swarm"]);
    registry.map_stage("Building", &["EnhancedBuilder"]);
    registry.map_stage("Validating", &["Validator"]);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildAggregationResult;
    use crate::fakes::{MemoryCoordinator, MemoryDesignStore, ScriptedExecutor, StaticAggregator, StaticLlm};

    fn full_capabilities() -> Capabilities {
        Capabilities::new()
            .with_llm(Arc::new(StaticLlm::succeeding("out")))
            .with_design_store(Arc::new(MemoryDesignStore::new()))
            .with_coordinator(Arc::new(MemoryCoordinator::new()))
            .with_swarm_config(SwarmConfig::default())
            .with_aggregator(Arc::new(StaticAggregator::new(
                BuildAggregationResult::failure("unused"),
            )))
            .with_build_executor(Arc::new(ScriptedExecutor::erroring("unused")))
    }

    #[test]
    fn test_resolve_every_registered_variant() {
        let registry = default_registry(full_capabilities());
        for agent_type in ["Planner", "Designer", "Swarm", "EnhancedBuilder", "Validator"] {
            let agent = registry.resolve(agent_type).unwrap();
            assert_eq!(agent.agent_type(), agent_type);
        }
    }

    #[test]
    fn test_unknown_agent_type_is_typed_not_fatal() {
        let registry = default_registry(full_capabilities());
        match registry.resolve("Telepath") {
            Err(FactoryError::UnknownAgentType(name)) => assert_eq!(name, "Telepath"),
            other => panic!("expected UnknownAgentType, got {:?}", other.map(|a| a.agent_type())),
        }
    }

    #[test]
    fn test_missing_capability_is_reported_by_shape() {
        // Only an LLM registered: designer's declared shape is unmet
        let capabilities = Capabilities::new().with_llm(Arc::new(StaticLlm::succeeding("out")));
        let registry = default_registry(capabilities);

        assert!(registry.resolve("Planner").is_ok());
        match registry.resolve("Designer") {
            Err(FactoryError::MissingCapability { capability, .. }) => {
                assert_eq!(capability, Capability::DesignStore)
            }
            other => panic!("expected MissingCapability, got {:?}", other.map(|a| a.agent_type())),
        }
    }

    #[test]
    fn test_stage_mapping() {
        let registry = default_registry(full_capabilities());

        let building = registry.agents_for_stage("Building");
        assert_eq!(building.len(), 1);
        assert_eq!(building[0].agent_type(), "EnhancedBuilder");

        // Unknown stage is a no-op stage, not a fault
        assert!(registry.agents_for_stage("Dreaming").is_empty());
    }

    #[test]
    fn test_construction_failure_degrades_to_no_agent() {
        // Swarm's declared shape is unmet; the stage degrades to empty
        let capabilities = Capabilities::new().with_llm(Arc::new(StaticLlm::succeeding("out")));
        let registry = default_registry(capabilities);
        assert!(registry.agents_for_stage("Swarming").is_empty());
    }

    #[test]
    fn test_registered_types_are_sorted() {
        let registry = default_registry(full_capabilities());
        assert_eq!(
            registry.registered_types(),
            vec!["Designer", "EnhancedBuilder", "Planner", "Swarm", "Validator"]
        );
    }
}
