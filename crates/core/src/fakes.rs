//! In-memory fakes for the capability traits (testing only)
//!
//! Satisfy the trait contracts without a model, a toolchain, or a live
//! delivery channel, so lifecycle and feedback behavior can be exercised
//! deterministically.

use crate::agents::{AgentExecutionContext, AgentExecutionResult};
use crate::build::{
    BuildAggregationResult, BuildError, BuildExecutionResult, BuildExecutor, DocumentAggregator,
};
use crate::messaging::{BuilderErrorMessage, BuilderNotificationMessage, MessageCoordinator};
use crate::models::LlmClient;
use crate::state::{DesignOutput, DesignOutputStore, StorageError};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// StaticLlm
// ---------------------------------------------------------------------------

/// LLM client that returns a canned result or a canned error
pub struct StaticLlm {
    output: Option<String>,
    error: Option<String>,
}

impl StaticLlm {
    /// Always generate a successful result with this output
    pub fn succeeding(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            error: None,
        }
    }

    /// Always fail generation with this error
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
impl LlmClient for StaticLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        _context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<AgentExecutionResult> {
        if cancel.is_cancelled() {
            anyhow::bail!("generation cancelled");
        }
        if let Some(error) = &self.error {
            anyhow::bail!("{}", error);
        }
        Ok(AgentExecutionResult::succeeded(
            self.output.clone().unwrap_or_default(),
        ))
    }
}

// ---------------------------------------------------------------------------
// MemoryDesignStore / FailingDesignStore
// ---------------------------------------------------------------------------

/// Design store backed by a vector
#[derive(Default)]
pub struct MemoryDesignStore {
    outputs: Mutex<Vec<DesignOutput>>,
}

impl MemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DesignOutputStore for MemoryDesignStore {
    async fn save(&self, output: &DesignOutput) -> Result<(), StorageError> {
        let mut outputs = self
            .outputs
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        outputs.push(output.clone());
        Ok(())
    }

    async fn list_for_execution(
        &self,
        pipeline_execution_id: &str,
    ) -> Result<Vec<DesignOutput>, StorageError> {
        let outputs = self
            .outputs
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(outputs
            .iter()
            .filter(|o| o.pipeline_execution_id == pipeline_execution_id)
            .cloned()
            .collect())
    }
}

/// Design store whose saves always fail
pub struct FailingDesignStore;

#[async_trait]
impl DesignOutputStore for FailingDesignStore {
    async fn save(&self, output: &DesignOutput) -> Result<(), StorageError> {
        Err(StorageError::NotFound(format!(
            "store unavailable for {}",
            output.id
        )))
    }

    async fn list_for_execution(
        &self,
        _pipeline_execution_id: &str,
    ) -> Result<Vec<DesignOutput>, StorageError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// MemoryCoordinator
// ---------------------------------------------------------------------------

/// Message coordinator that records every envelope
#[derive(Default)]
pub struct MemoryCoordinator {
    notifications: Mutex<Vec<BuilderNotificationMessage>>,
    errors: Mutex<Vec<BuilderErrorMessage>>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, in delivery order
    pub fn notifications(&self) -> Vec<BuilderNotificationMessage> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Error notices received so far, in delivery order
    pub fn errors(&self) -> Vec<BuilderErrorMessage> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageCoordinator for MemoryCoordinator {
    async fn send_notification(
        &self,
        message: BuilderNotificationMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("delivery cancelled");
        }
        self.notifications
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .push(message);
        Ok(())
    }

    async fn send_error(
        &self,
        message: BuilderErrorMessage,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("delivery cancelled");
        }
        self.errors
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .push(message);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticAggregator
// ---------------------------------------------------------------------------

/// Aggregator that returns a canned result
pub struct StaticAggregator {
    result: BuildAggregationResult,
}

impl StaticAggregator {
    pub fn new(result: BuildAggregationResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl DocumentAggregator for StaticAggregator {
    async fn aggregate_for_build(
        &self,
        _project_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildAggregationResult> {
        if cancel.is_cancelled() {
            anyhow::bail!("aggregation cancelled");
        }
        Ok(self.result.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

enum ExecutorScript {
    Succeed { output: String, duration_ms: u64 },
    Fail { output: String, errors: Vec<BuildError> },
    Error { message: String },
}

/// Build executor following a fixed script
pub struct ScriptedExecutor {
    script: ExecutorScript,
}

impl ScriptedExecutor {
    /// Always succeed with this raw output and duration
    pub fn succeeding(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            script: ExecutorScript::Succeed {
                output: output.into(),
                duration_ms,
            },
        }
    }

    /// Always fail with these structured defects
    pub fn failing(output: impl Into<String>, errors: Vec<BuildError>) -> Self {
        Self {
            script: ExecutorScript::Fail {
                output: output.into(),
                errors,
            },
        }
    }

    /// Always return an infrastructure error (the capability "throws")
    pub fn erroring(message: impl Into<String>) -> Self {
        Self {
            script: ExecutorScript::Error {
                message: message.into(),
            },
        }
    }
}

#[async_trait]
impl BuildExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _working_dir: &Path,
        _language: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildExecutionResult> {
        if cancel.is_cancelled() {
            anyhow::bail!("build cancelled");
        }
        match &self.script {
            ExecutorScript::Succeed { output, duration_ms } => {
                Ok(BuildExecutionResult::succeeded(output.clone(), *duration_ms))
            }
            ExecutorScript::Fail { output, errors } => Ok(BuildExecutionResult::failed(
                output.clone(),
                0,
                errors.clone(),
            )),
            ExecutorScript::Error { message } => anyhow::bail!("{}", message),
        }
    }
}
