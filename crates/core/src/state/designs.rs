//! # Design Output Store
//!
//! Secondary persistence for designer-stage output. Designer agents write
//! here from their post-execution hook; failures are surfaced to the
//! lifecycle wrapper, which records them as a degraded storage outcome
//! without failing the agent.

use super::db::CrucibleDb;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from design output persistence
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage lock poisoned: {0}")]
    Lock(String),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("design output not found: {0}")]
    NotFound(String),
}

/// A persisted designer output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignOutput {
    /// Unique output identifier
    pub id: String,
    /// Owning project
    pub project_id: String,
    /// Pipeline execution that produced the output
    pub pipeline_execution_id: String,
    /// Agent type that produced it
    pub agent_type: String,
    /// The output text
    pub output: String,
    /// Quality score of the producing result
    pub quality_score: u8,
    /// Confidence score of the producing result
    pub confidence_score: u8,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl DesignOutput {
    /// Create a new design output record
    pub fn new(
        project_id: impl Into<String>,
        pipeline_execution_id: impl Into<String>,
        agent_type: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("design-{}", crate::messaging::unique_id()),
            project_id: project_id.into(),
            pipeline_execution_id: pipeline_execution_id.into(),
            agent_type: agent_type.into(),
            output: output.into(),
            quality_score: 0,
            confidence_score: 0,
            created_at: Utc::now(),
        }
    }

    /// Set quality and confidence scores
    pub fn with_scores(mut self, quality: u8, confidence: u8) -> Self {
        self.quality_score = quality;
        self.confidence_score = confidence;
        self
    }
}

/// Capability: persistence of designer output to a secondary store
#[async_trait]
pub trait DesignOutputStore: Send + Sync {
    /// Persist one design output
    async fn save(&self, output: &DesignOutput) -> Result<(), StorageError>;

    /// List outputs for one pipeline execution
    async fn list_for_execution(
        &self,
        pipeline_execution_id: &str,
    ) -> Result<Vec<DesignOutput>, StorageError>;
}

/// SQLite-backed design output store
pub struct SqliteDesignStore {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteDesignStore {
    /// Create a store over a CrucibleDb
    pub fn new(db: &CrucibleDb) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    fn row_to_output(row: &rusqlite::Row) -> rusqlite::Result<DesignOutput> {
        let created_at_str: String = row.get(7)?;
        Ok(DesignOutput {
            id: row.get(0)?,
            project_id: row.get(1)?,
            pipeline_execution_id: row.get(2)?,
            agent_type: row.get(3)?,
            output: row.get(4)?,
            quality_score: row.get(5)?,
            confidence_score: row.get(6)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl DesignOutputStore for SqliteDesignStore {
    async fn save(&self, output: &DesignOutput) -> Result<(), StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO design_outputs
            (id, project_id, pipeline_execution_id, agent_type, output, quality_score, confidence_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                output.id,
                output.project_id,
                output.pipeline_execution_id,
                output.agent_type,
                output.output,
                output.quality_score,
                output.confidence_score,
                output.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn list_for_execution(
        &self,
        pipeline_execution_id: &str,
    ) -> Result<Vec<DesignOutput>, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, project_id, pipeline_execution_id, agent_type, output, quality_score, confidence_score, created_at
            FROM design_outputs
            WHERE pipeline_execution_id = ?1
            ORDER BY created_at, id
            "#,
        )?;

        let outputs = stmt
            .query_map(params![pipeline_execution_id], |row| {
                Ok(Self::row_to_output(row)?)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_design_output_round_trip() {
        let path = ".crucible/test_designs.db";
        let _ = fs::remove_file(path);

        let db = CrucibleDb::open_at(path).unwrap();
        let store = SqliteDesignStore::new(&db);

        let output = DesignOutput::new("proj-1", "pipe-1", "Designer", "## API Design\n...")
            .with_scores(8, 7);
        store.save(&output).await.unwrap();

        let outputs = store.list_for_execution("pipe-1").await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].agent_type, "Designer");
        assert_eq!(outputs[0].quality_score, 8);

        assert!(store.list_for_execution("pipe-9").await.unwrap().is_empty());

        let _ = fs::remove_file(path);
    }
}
