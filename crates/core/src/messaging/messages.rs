//! # Builder Messages
//!
//! Wire-level envelopes the build subsystem emits toward the coordination
//! layer. A downstream consumer can act on either message without
//! re-querying the build result: notifications spawn completion
//! acknowledgments, error messages spawn corrective work.
//!
//! Every envelope carries a stable idempotency key
//! (`{project_id}:{code_unit}:{invocation_id}`) so redelivery never spawns
//! duplicate remediation.

use crate::agents::AgentExecutionContext;
use crate::build::{BuildError, BuildErrorType};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Completion notice for one aggregated file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BuilderNotificationMessage {
    /// Unique message ID
    pub id: String,
    /// Stable key for downstream deduplication
    pub idempotency_key: String,
    /// Emission timestamp
    pub timestamp: DateTime<Utc>,
    /// Owning project
    pub project_id: String,
    /// Pipeline execution the build belongs to
    pub pipeline_execution_id: String,
    /// Code unit this notice covers
    pub code_unit: String,
    /// File the code unit was built into
    pub file_name: String,
    /// Status of the code unit (e.g., "Complete", "Dispatched")
    pub status: String,
    /// Total functions in the code unit
    pub functions_total: u32,
    /// Functions completed
    pub functions_completed: u32,
    /// Functions that failed
    pub functions_failed: u32,
    /// Quality score assessed for the code unit, 0-10
    pub quality_score: u8,
}

impl BuilderNotificationMessage {
    /// A "Complete" notice for a successfully built file
    pub fn completed(
        context: &AgentExecutionContext,
        code_unit: &str,
        file_name: &str,
        function_count: u32,
        quality_score: u8,
        invocation_id: &str,
    ) -> Self {
        Self {
            id: unique_id(),
            idempotency_key: idempotency_key(&context.project_id, code_unit, invocation_id),
            timestamp: Utc::now(),
            project_id: context.project_id.clone(),
            pipeline_execution_id: context.pipeline_execution_id.clone(),
            code_unit: code_unit.to_string(),
            file_name: file_name.to_string(),
            status: "Complete".to_string(),
            functions_total: function_count,
            functions_completed: function_count,
            functions_failed: 0,
            quality_score,
        }
    }

    /// A "Dispatched" notice announcing a queued code unit
    pub fn dispatched(
        context: &AgentExecutionContext,
        code_unit: &str,
        invocation_id: &str,
    ) -> Self {
        Self {
            id: unique_id(),
            idempotency_key: idempotency_key(&context.project_id, code_unit, invocation_id),
            timestamp: Utc::now(),
            project_id: context.project_id.clone(),
            pipeline_execution_id: context.pipeline_execution_id.clone(),
            code_unit: code_unit.to_string(),
            file_name: String::new(),
            status: "Dispatched".to_string(),
            functions_total: 0,
            functions_completed: 0,
            functions_failed: 0,
            quality_score: 0,
        }
    }
}

/// One defect notice; maps 1:1 to a [`BuildError`]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BuilderErrorMessage {
    /// Unique message ID
    pub id: String,
    /// Stable key for downstream deduplication
    pub idempotency_key: String,
    /// Emission timestamp
    pub timestamp: DateTime<Utc>,
    /// Owning project
    pub project_id: String,
    /// Pipeline execution the build belongs to
    pub pipeline_execution_id: String,
    /// Code unit that owns the defect, when known
    pub code_unit: Option<String>,
    /// File that owns the defect, when known
    pub file_name: Option<String>,
    /// Defect taxonomy
    pub error_type: BuildErrorType,
    /// Short message
    pub message: String,
    /// Longer detail text
    pub detail: String,
    /// Severity, 1-10
    pub severity: u8,
    /// Offending function, when known
    pub function_name: Option<String>,
    /// Line number within the owning file
    pub line_number: Option<u32>,
    /// Suggested fix, when the toolchain offered one
    pub suggested_fix: Option<String>,
    /// Other functions implicated in the defect
    pub related_functions: Vec<String>,
}

impl BuilderErrorMessage {
    /// Build the envelope for one defect, copying its fields verbatim
    pub fn from_build_error(
        context: &AgentExecutionContext,
        error: &BuildError,
        invocation_id: &str,
    ) -> Self {
        let code_unit = error.code_unit.as_deref().unwrap_or("build");
        Self {
            id: unique_id(),
            idempotency_key: idempotency_key(&context.project_id, code_unit, invocation_id),
            timestamp: Utc::now(),
            project_id: context.project_id.clone(),
            pipeline_execution_id: context.pipeline_execution_id.clone(),
            code_unit: error.code_unit.clone(),
            file_name: error.file_name.clone(),
            error_type: error.error_type,
            message: error.message.clone(),
            detail: error.detail.clone(),
            severity: error.severity,
            function_name: error.function_name.clone(),
            line_number: error.line_number,
            suggested_fix: error.suggested_fix.clone(),
            related_functions: error.related_functions.clone(),
        }
    }
}

/// Stable idempotency key for one code unit within one build attempt
fn idempotency_key(project_id: &str, code_unit: &str, invocation_id: &str) -> String {
    format!("{}:{}:{}", project_id, code_unit, invocation_id)
}

/// Generate a simple unique ID
pub fn unique_id() -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("{:x}-{:x}", nanos, rand_u32())
}

/// Simple random number (not cryptographic)
fn rand_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AgentExecutionContext {
        AgentExecutionContext::new("proj-1", "pipe-1", "exec-1")
    }

    #[test]
    fn test_completed_notification() {
        let msg =
            BuilderNotificationMessage::completed(&context(), "UserService", "UserService.cs", 4, 9, "inv-1");
        assert_eq!(msg.status, "Complete");
        assert_eq!(msg.functions_total, 4);
        assert_eq!(msg.functions_completed, 4);
        assert_eq!(msg.functions_failed, 0);
        assert_eq!(msg.idempotency_key, "proj-1:UserService:inv-1");
    }

    #[test]
    fn test_error_message_copies_fields_verbatim() {
        let error = BuildError::new(BuildErrorType::CompilationError, "; expected")
            .with_location("UserService.cs", 12)
            .with_severity(7)
            .with_suggested_fix("add a semicolon");

        let msg = BuilderErrorMessage::from_build_error(&context(), &error, "inv-1");
        assert_eq!(msg.error_type, BuildErrorType::CompilationError);
        assert_eq!(msg.message, "; expected");
        assert_eq!(msg.severity, 7);
        assert_eq!(msg.file_name.as_deref(), Some("UserService.cs"));
        assert_eq!(msg.line_number, Some(12));
        assert_eq!(msg.suggested_fix.as_deref(), Some("add a semicolon"));
    }

    #[test]
    fn test_unique_ids_differ() {
        assert_ne!(unique_id(), unique_id());
    }
}
