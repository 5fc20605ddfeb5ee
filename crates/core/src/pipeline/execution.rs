//! # Pipeline Execution
//!
//! The umbrella record tracking one pipeline run. Agents read it and append
//! result summaries through the manager; they never own its lifecycle.

use super::stage::PipelineStage;
use crate::agents::AgentExecutionResult;
use crate::state::CrucibleDb;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Status of a pipeline execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Running,
    Complete,
    Failed,
}

impl ExecutionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "complete" => Self::Complete,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// Condensed record of one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultSummary {
    pub agent_type: String,
    pub success: bool,
    pub quality_score: u8,
    pub confidence_score: u8,
    pub duration_ms: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AgentResultSummary {
    /// Summarize a full execution result
    pub fn from_result(agent_type: &str, result: &AgentExecutionResult) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            success: result.success,
            quality_score: result.quality_score,
            confidence_score: result.confidence_score,
            duration_ms: result.duration_ms,
            error_message: result.error_message.clone(),
        }
    }
}

/// One pipeline run for a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineExecution {
    /// Unique execution identifier
    pub id: String,
    /// Owning project
    pub project_id: String,
    /// Current stage
    pub stage: PipelineStage,
    /// Overall status
    pub status: ExecutionStatus,
    /// Appended agent result summaries, in completion order
    #[serde(default)]
    pub results: Vec<AgentResultSummary>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl PipelineExecution {
    /// Start a new execution for a project
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("pipe-{}", crate::messaging::unique_id()),
            project_id: project_id.into(),
            stage: PipelineStage::Planning,
            status: ExecutionStatus::Running,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Manager for pipeline execution storage in SQLite
pub struct ExecutionManager {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl ExecutionManager {
    /// Create a new ExecutionManager from a CrucibleDb
    pub fn new(db: &CrucibleDb) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    /// Save/update an execution
    pub fn save(&self, execution: &PipelineExecution) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let results_json = serde_json::to_string(&execution.results)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO pipeline_executions
            (id, project_id, stage, status, results_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                execution.id,
                execution.project_id,
                execution.stage.as_str(),
                execution.status.as_str(),
                results_json,
                execution.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to save pipeline execution")?;

        Ok(())
    }

    /// Load an execution by ID
    pub fn load(&self, id: &str) -> Result<PipelineExecution> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let execution = conn
            .query_row(
                r#"
                SELECT id, project_id, stage, status, results_json, created_at, updated_at
                FROM pipeline_executions WHERE id = ?1
                "#,
                params![id],
                |row| Ok(Self::row_to_execution(row)?),
            )
            .context("Pipeline execution not found")?;

        Ok(execution)
    }

    /// Append one agent result to an execution
    pub fn append_result(
        &self,
        id: &str,
        agent_type: &str,
        result: &AgentExecutionResult,
    ) -> Result<()> {
        let mut execution = self.load(id)?;
        execution
            .results
            .push(AgentResultSummary::from_result(agent_type, result));
        self.save(&execution)
    }

    /// Update an execution's stage and status
    pub fn update_stage(&self, id: &str, stage: PipelineStage, status: ExecutionStatus) -> Result<()> {
        let mut execution = self.load(id)?;
        execution.stage = stage;
        execution.status = status;
        self.save(&execution)
    }

    fn row_to_execution(row: &rusqlite::Row) -> rusqlite::Result<PipelineExecution> {
        let stage: String = row.get(2)?;
        let status: String = row.get(3)?;
        let results_json: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        Ok(PipelineExecution {
            id: row.get(0)?,
            project_id: row.get(1)?,
            stage: PipelineStage::from_str(&stage),
            status: ExecutionStatus::from_str(&status),
            results: serde_json::from_str(&results_json).unwrap_or_default(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_execution_round_trip() {
        let path = ".crucible/test_executions.db";
        let _ = fs::remove_file(path);

        let db = CrucibleDb::open_at(path).unwrap();
        let mgr = ExecutionManager::new(&db);

        let execution = PipelineExecution::new("proj-1");
        mgr.save(&execution).unwrap();

        let result = AgentExecutionResult::succeeded("plan").with_scores(8, 7);
        mgr.append_result(&execution.id, "Planner", &result).unwrap();

        let loaded = mgr.load(&execution.id).unwrap();
        assert_eq!(loaded.project_id, "proj-1");
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].agent_type, "Planner");
        assert_eq!(loaded.results[0].quality_score, 8);

        mgr.update_stage(&execution.id, PipelineStage::Building, ExecutionStatus::Running)
            .unwrap();
        let loaded = mgr.load(&execution.id).unwrap();
        assert_eq!(loaded.stage, PipelineStage::Building);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_missing_execution_fails() {
        let path = ".crucible/test_executions_missing.db";
        let _ = fs::remove_file(path);

        let db = CrucibleDb::open_at(path).unwrap();
        let mgr = ExecutionManager::new(&db);
        assert!(mgr.load("ghost").is_err());

        let _ = fs::remove_file(path);
    }
}
