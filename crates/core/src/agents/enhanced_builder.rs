//! # Enhanced Builder Agent
//!
//! Building-stage agent driving the build feedback loop:
//!
//! ```text
//! Aggregating → Building → {NotifyingSuccess | NotifyingFailure} → Done
//! ```
//!
//! The machine is re-run fresh on every retry of the Building stage. On
//! success it emits exactly one notification per aggregated file; on failure
//! exactly one error message per defect — never both for the same code unit
//! in one attempt. Infrastructure failures during materialization or
//! toolchain invocation are normalized into a single severity-10
//! `BuildSystemError` so they share the defect shape downstream.

use super::{Agent, AgentExecutionContext, AgentExecutionResult, Artifact, Priority};
use crate::build::{
    report, BuildAggregationResult, BuildExecutionResult, BuildExecutor, BuildWorkspace,
    DocumentAggregator,
};
use crate::messaging::{BuilderErrorMessage, BuilderNotificationMessage, MessageCoordinator};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default root for per-attempt build working areas
const DEFAULT_WORKSPACE_BASE: &str = ".crucible/builds";

/// Building-stage agent
pub struct EnhancedBuilderAgent {
    aggregator: Arc<dyn DocumentAggregator>,
    executor: Arc<dyn BuildExecutor>,
    coordinator: Arc<dyn MessageCoordinator>,
    workspace_base: PathBuf,
}

impl EnhancedBuilderAgent {
    pub fn new(
        aggregator: Arc<dyn DocumentAggregator>,
        executor: Arc<dyn BuildExecutor>,
        coordinator: Arc<dyn MessageCoordinator>,
    ) -> Self {
        Self {
            aggregator,
            executor,
            coordinator,
            workspace_base: PathBuf::from(DEFAULT_WORKSPACE_BASE),
        }
    }

    /// Override the working-area root (useful for testing)
    pub fn with_workspace_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.workspace_base = base.into();
        self
    }

    /// Fixed quality rule for a successfully built file and for the
    /// overall success result
    fn success_quality_score() -> u8 {
        9
    }

    /// Quality rule for a failed build: max(1, 5 - error_count)
    fn failure_quality_score(error_count: usize) -> u8 {
        5usize.saturating_sub(error_count).max(1) as u8
    }

    /// Materialize the aggregated files and invoke the toolchain
    async fn attempt_build(
        &self,
        workspace: &BuildWorkspace,
        aggregation: &BuildAggregationResult,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<BuildExecutionResult> {
        workspace.materialize(&aggregation.files).await?;

        let language = aggregation
            .dominant_language()
            .unwrap_or(&context.target_language)
            .to_string();

        self.executor
            .execute(workspace.path(), &language, cancel)
            .await
    }

    /// Success branch: one notification per aggregated file, then the report
    async fn notify_success(
        &self,
        context: &AgentExecutionContext,
        aggregation: &BuildAggregationResult,
        execution: &BuildExecutionResult,
        workspace: &BuildWorkspace,
        invocation_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        for file in &aggregation.files {
            let message = BuilderNotificationMessage::completed(
                context,
                &file.code_unit,
                &file.file_name,
                file.function_count,
                Self::success_quality_score(),
                invocation_id,
            );
            self.coordinator.send_notification(message, cancel).await?;
        }

        tracing::info!(
            project = %context.project_id,
            files = aggregation.files.len(),
            "build succeeded; completion notices sent"
        );

        let report = report::success_report(aggregation, execution);
        let mut result = AgentExecutionResult::succeeded(report.clone())
            .with_scores(Self::success_quality_score(), 9)
            .with_artifact(Artifact::text("build_report", "text/markdown", report))
            .with_metadata("files_built", serde_json::json!(aggregation.files.len()));

        for path in &execution.artifacts {
            match workspace.read_output(path).await {
                Ok(content) => {
                    result.artifacts.push(
                        Artifact::text(path.clone(), "application/octet-stream", content)
                            .with_path(path.clone()),
                    );
                }
                Err(e) => {
                    tracing::warn!(artifact = %path, error = %e, "build output unreadable; skipped");
                }
            }
        }

        Ok(result)
    }

    /// Failure branch: one error message per defect, then the report
    async fn notify_failure(
        &self,
        context: &AgentExecutionContext,
        aggregation: &BuildAggregationResult,
        execution: &BuildExecutionResult,
        invocation_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        for error in &execution.errors {
            let message = BuilderErrorMessage::from_build_error(context, error, invocation_id);
            self.coordinator.send_error(message, cancel).await?;
        }

        tracing::warn!(
            project = %context.project_id,
            errors = execution.errors.len(),
            "build failed; defect notices sent"
        );

        let report = report::failure_report(aggregation, execution);
        let mut result = AgentExecutionResult::failed(
            execution
                .error_message
                .clone()
                .unwrap_or_else(|| "Build failed".to_string()),
        )
        .with_scores(Self::failure_quality_score(execution.errors.len()), 8)
        .with_artifact(Artifact::text("build_report", "text/markdown", report.clone()))
        .with_metadata("error_count", serde_json::json!(execution.errors.len()));
        result.output = report;

        Ok(result)
    }
}

#[async_trait]
impl Agent for EnhancedBuilderAgent {
    fn agent_type(&self) -> &'static str {
        "EnhancedBuilder"
    }

    fn name(&self) -> &'static str {
        "Enhanced Builder"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn estimated_duration_secs(&self, context: &AgentExecutionContext) -> u64 {
        120 + (context.input_prompt.len() as u64) / 100
    }

    async fn execute_internal(
        &self,
        context: &AgentExecutionContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<AgentExecutionResult> {
        // Aggregating
        let aggregation = self
            .aggregator
            .aggregate_for_build(&context.project_id, cancel)
            .await?;

        if !aggregation.success {
            // The build is never attempted against an incomplete file set.
            tracing::warn!(project = %context.project_id, reason = %aggregation.message, "aggregation failed");
            let report = report::aggregation_failure_report(&aggregation.message);
            let mut result = AgentExecutionResult::failed(aggregation.message.clone())
                .with_scores(0, 0)
                .with_artifact(Artifact::text("build_report", "text/markdown", report.clone()));
            result.output = report;
            return Ok(result);
        }

        // Building, in an area no concurrent attempt can share
        let invocation_id = crate::messaging::unique_id();
        let workspace =
            BuildWorkspace::new(&self.workspace_base, &context.project_id, &invocation_id);

        let execution = match self
            .attempt_build(&workspace, &aggregation, context, cancel)
            .await
        {
            Ok(execution) => execution,
            Err(e) => {
                tracing::warn!(project = %context.project_id, error = %e, "build infrastructure fault");
                BuildExecutionResult::system_failure(&e)
            }
        };

        // Notifying
        let result = if execution.success {
            self.notify_success(context, &aggregation, &execution, &workspace, &invocation_id, cancel)
                .await?
        } else {
            self.notify_failure(context, &aggregation, &execution, &invocation_id, cancel)
                .await?
        };

        workspace.cleanup();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{AggregatedFile, BuildError, BuildErrorType};
    use crate::fakes::{MemoryCoordinator, ScriptedExecutor, StaticAggregator};

    fn context() -> AgentExecutionContext {
        AgentExecutionContext::new("proj-1", "pipe-1", "exec-1").with_language("csharp")
    }

    fn two_file_aggregation() -> BuildAggregationResult {
        BuildAggregationResult {
            success: true,
            message: "Aggregated 3 document(s) into 2 file(s)".to_string(),
            document_count: 3,
            code_unit_count: 2,
            languages: vec!["csharp".to_string()],
            files: vec![
                AggregatedFile {
                    file_name: "UserService.cs".to_string(),
                    language: "csharp".to_string(),
                    content: "class UserService {}".to_string(),
                    code_unit: "UserService".to_string(),
                    function_count: 4,
                    total_size: 20,
                },
                AggregatedFile {
                    file_name: "UserController.cs".to_string(),
                    language: "csharp".to_string(),
                    content: "class UserController {}".to_string(),
                    code_unit: "UserController".to_string(),
                    function_count: 2,
                    total_size: 23,
                },
            ],
        }
    }

    fn builder(
        aggregation: BuildAggregationResult,
        executor: ScriptedExecutor,
    ) -> (EnhancedBuilderAgent, Arc<MemoryCoordinator>) {
        let coordinator = Arc::new(MemoryCoordinator::new());
        let agent = EnhancedBuilderAgent::new(
            Arc::new(StaticAggregator::new(aggregation)),
            Arc::new(executor),
            Arc::clone(&coordinator) as Arc<dyn MessageCoordinator>,
        )
        .with_workspace_base(format!(".crucible/test_builds/{}", crate::messaging::unique_id()));
        (agent, coordinator)
    }

    #[tokio::test]
    async fn test_successful_build_notifies_each_file() {
        // Scenario A: 3 documents collapsed into 2 files, build succeeds in 12s
        let (agent, coordinator) = builder(
            two_file_aggregation(),
            ScriptedExecutor::succeeding("Build succeeded.", 12_000),
        );

        let result = agent.execute(&context(), &CancellationToken::new()).await;

        assert!(result.success);
        assert_eq!(result.quality_score, 9);
        assert_eq!(result.confidence_score, 9);
        assert!(result.output.contains("**Status:** Success"));
        assert_eq!(result.artifacts[0].name, "build_report");

        let notifications = coordinator.notifications();
        assert_eq!(notifications.len(), 2, "exactly one notice per file");
        assert!(coordinator.errors().is_empty(), "never both message kinds");

        assert_eq!(notifications[0].code_unit, "UserService");
        assert_eq!(notifications[0].status, "Complete");
        assert_eq!(notifications[0].functions_total, 4);
        assert_eq!(notifications[0].functions_completed, 4);
        assert_eq!(notifications[0].functions_failed, 0);
        assert_eq!(notifications[1].code_unit, "UserController");
        assert_eq!(notifications[1].functions_total, 2);
    }

    #[tokio::test]
    async fn test_failed_build_notifies_each_error() {
        // Scenario B: 2 errors with severities 7 and 4
        let errors = vec![
            BuildError::new(BuildErrorType::CompilationError, "; expected")
                .with_location("UserService.cs", 12)
                .with_severity(7),
            BuildError::new(BuildErrorType::SemanticError, "unknown type 'Foo'").with_severity(4),
        ];
        let (agent, coordinator) = builder(
            two_file_aggregation(),
            ScriptedExecutor::failing("compile errors", errors),
        );

        let result = agent.execute(&context(), &CancellationToken::new()).await;

        assert!(!result.success);
        assert_eq!(result.quality_score, 3, "max(1, 5 - 2)");
        assert_eq!(result.confidence_score, 8);
        assert!(result.output.contains("**Status:** Failed"));

        let errors = coordinator.errors();
        assert_eq!(errors.len(), 2, "exactly one notice per defect");
        assert!(coordinator.notifications().is_empty());
        assert_eq!(errors[0].severity, 7);
        assert_eq!(errors[0].message, "; expected");
        assert_eq!(errors[0].line_number, Some(12));
        assert_eq!(errors[1].severity, 4);
        assert_eq!(errors[1].error_type, BuildErrorType::SemanticError);
    }

    #[tokio::test]
    async fn test_executor_fault_becomes_single_system_error() {
        let (agent, coordinator) = builder(
            two_file_aggregation(),
            ScriptedExecutor::erroring("toolchain missing"),
        );

        let result = agent.execute(&context(), &CancellationToken::new()).await;

        assert!(!result.success);
        assert_eq!(result.quality_score, 4, "max(1, 5 - 1)");
        assert_eq!(result.confidence_score, 8);

        let errors = coordinator.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, BuildErrorType::BuildSystemError);
        assert_eq!(errors[0].severity, 10);
        assert!(errors[0].detail.contains("toolchain missing"));
    }

    #[tokio::test]
    async fn test_aggregation_failure_skips_build() {
        let (agent, coordinator) = builder(
            BuildAggregationResult::failure("No code documents found for project proj-1"),
            ScriptedExecutor::erroring("must never run"),
        );

        let result = agent.execute(&context(), &CancellationToken::new()).await;

        assert!(!result.success);
        assert_eq!(result.quality_score, 0);
        assert!(result
            .error_message
            .as_deref()
            .unwrap()
            .contains("No code documents"));
        assert!(result.output.contains("Not attempted"));

        // No build, no messages of either kind
        assert!(coordinator.notifications().is_empty());
        assert!(coordinator.errors().is_empty());
    }

    #[tokio::test]
    async fn test_many_errors_floor_quality_at_one() {
        let errors: Vec<BuildError> = (0..7)
            .map(|i| {
                BuildError::new(BuildErrorType::CompilationError, format!("error {}", i))
                    .with_severity(6)
            })
            .collect();
        let (agent, coordinator) =
            builder(two_file_aggregation(), ScriptedExecutor::failing("bad", errors));

        let result = agent.execute(&context(), &CancellationToken::new()).await;
        assert_eq!(result.quality_score, 1);
        assert_eq!(coordinator.errors().len(), 7);
    }
}
