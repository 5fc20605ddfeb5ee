//! # Agent Execution Context
//!
//! The immutable per-invocation input shared by every agent of a stage.
//! Created once by the caller when a pipeline execution enters a stage;
//! read-only to agents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shared, read-only input for one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionContext {
    /// Project the pipeline is building
    pub project_id: String,
    /// Umbrella pipeline execution this invocation belongs to
    pub pipeline_execution_id: String,
    /// Unique id of this stage invocation
    pub execution_id: String,
    /// Target language of the generated code (e.g., "csharp", "rust")
    pub target_language: String,
    /// Deployment target (e.g., "azure", "docker")
    pub deployment_target: String,
    /// The input prompt / specification text for this stage
    pub input_prompt: String,
    /// Arbitrary per-stage parameters
    #[serde(default)]
    pub stage_parameters: HashMap<String, serde_json::Value>,
}

impl AgentExecutionContext {
    /// Create a context for a project and pipeline execution
    pub fn new(
        project_id: impl Into<String>,
        pipeline_execution_id: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            pipeline_execution_id: pipeline_execution_id.into(),
            execution_id: execution_id.into(),
            target_language: "csharp".to_string(),
            deployment_target: "docker".to_string(),
            input_prompt: String::new(),
            stage_parameters: HashMap::new(),
        }
    }

    /// Set the target language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    /// Set the deployment target
    pub fn with_deployment_target(mut self, target: impl Into<String>) -> Self {
        self.deployment_target = target.into();
        self
    }

    /// Set the input prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.input_prompt = prompt.into();
        self
    }

    /// Add a stage parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.stage_parameters.insert(key.into(), value);
        self
    }

    /// Look up a stage parameter
    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.stage_parameters.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = AgentExecutionContext::new("proj-1", "pipe-1", "exec-1")
            .with_language("rust")
            .with_prompt("Build a parser")
            .with_parameter("code_units", serde_json::json!(["Lexer", "Parser"]));

        assert_eq!(ctx.project_id, "proj-1");
        assert_eq!(ctx.target_language, "rust");
        assert!(ctx.parameter("code_units").is_some());
        assert!(ctx.parameter("missing").is_none());
    }
}
