//! # Agent Execution Result
//!
//! The structured outcome of one agent invocation, plus the artifacts it
//! produced. Results are created inside `execute_internal` and finalized by
//! the lifecycle wrapper; after the stage completes they are never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of post-execution bookkeeping (output persistence)
///
/// Bookkeeping failures never flip an agent's success flag; they are
/// recorded here so the caller can see the degradation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum StorageOutcome {
    /// Output persisted (or nothing to persist)
    #[default]
    Ok,
    /// Work product intact, but persistence partially failed
    Degraded { reason: String },
    /// Persistence failed entirely
    Failed { reason: String },
}

impl StorageOutcome {
    /// Whether persistence completed without degradation
    pub fn is_ok(&self) -> bool {
        matches!(self, StorageOutcome::Ok)
    }
}

/// A file or document produced by an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact name (e.g., "build_report")
    pub name: String,
    /// Declared content type (e.g., "text/markdown")
    pub content_type: String,
    /// Content blob
    pub content: String,
    /// Logical path of the artifact
    pub path: String,
    /// Content size in bytes
    pub size_bytes: u64,
}

impl Artifact {
    /// Create a text artifact
    pub fn text(name: impl Into<String>, content_type: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let content = content.into();
        Self {
            path: name.clone(),
            size_bytes: content.len() as u64,
            name,
            content_type: content_type.into(),
            content,
        }
    }

    /// Create a JSON artifact from any serializable value
    pub fn from_json<T: Serialize>(name: impl Into<String>, value: &T) -> anyhow::Result<Self> {
        let content = serde_json::to_string_pretty(value)?;
        Ok(Self::text(name, "application/json", content))
    }

    /// Override the logical path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Result of one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    /// Whether the agent's core work succeeded
    pub success: bool,
    /// Human-readable output (markdown for reporting agents)
    pub output: String,
    /// Error message when `success` is false
    #[serde(default)]
    pub error_message: Option<String>,
    /// Assessed correctness of the output, 0-10
    pub quality_score: u8,
    /// Agent's certainty in that assessment, 0-10
    pub confidence_score: u8,
    /// Wall-clock duration of the invocation
    #[serde(default)]
    pub duration_ms: u64,
    /// Artifacts produced, in emission order
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Open-ended metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Outcome of post-execution persistence
    #[serde(default)]
    pub storage: StorageOutcome,
}

impl AgentExecutionResult {
    /// A successful result with the given output text
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error_message: None,
            quality_score: 7,
            confidence_score: 7,
            duration_ms: 0,
            artifacts: Vec::new(),
            metadata: HashMap::new(),
            storage: StorageOutcome::Ok,
        }
    }

    /// A failed result with depressed scores
    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            output: String::new(),
            error_message: Some(error),
            quality_score: 1,
            confidence_score: 1,
            duration_ms: 0,
            artifacts: Vec::new(),
            metadata: HashMap::new(),
            storage: StorageOutcome::Ok,
        }
    }

    /// Set quality and confidence scores (clamped to 0-10)
    pub fn with_scores(mut self, quality: u8, confidence: u8) -> Self {
        self.quality_score = quality.min(10);
        self.confidence_score = confidence.min(10);
        self
    }

    /// Attach an artifact
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
