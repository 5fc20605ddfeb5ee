//! # Unified Crucible Database
//!
//! Single SQLite database for all Crucible state persistence: granular code
//! documents, designer outputs, and pipeline execution records live in
//! `.crucible/crucible.db`.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// Unified database manager for all Crucible state
pub struct CrucibleDb {
    conn: Arc<Mutex<Connection>>,
}

impl CrucibleDb {
    /// Open or create the unified database at `.crucible/crucible.db`
    pub fn open() -> Result<Self> {
        Self::open_at(".crucible/crucible.db")
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path.as_ref()).context("Failed to open crucible database")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Get a shared connection for use by other modules
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Run schema migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            self.migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        Ok(())
    }

    /// Migration to version 1 - complete schema
    fn migrate_v1(&self, conn: &Connection) -> Result<()> {
        // Granular code documents produced by earlier stages
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS code_documents (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                code_unit TEXT NOT NULL,
                file_name TEXT NOT NULL,
                language TEXT NOT NULL,
                content TEXT NOT NULL,
                function_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // Designer outputs persisted by the post-execution hook
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS design_outputs (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                pipeline_execution_id TEXT NOT NULL,
                agent_type TEXT NOT NULL,
                output TEXT NOT NULL,
                quality_score INTEGER NOT NULL,
                confidence_score INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // Umbrella pipeline execution records
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_executions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'running',
                results_json TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_project ON code_documents(project_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_designs_execution ON design_outputs(pipeline_execution_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_executions_project ON pipeline_executions(project_id)",
            [],
        )?;

        tracing::info!(
            "CrucibleDb initialized with schema version {}",
            SCHEMA_VERSION
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_crucible_db_open_creates_tables() {
        let path = ".crucible/test_crucible.db";
        let _ = fs::remove_file(path);

        let db = CrucibleDb::open_at(path).unwrap();
        let conn = db.connection();
        let conn = conn.lock().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"code_documents".to_string()));
        assert!(tables.contains(&"design_outputs".to_string()));
        assert!(tables.contains(&"pipeline_executions".to_string()));

        drop(conn);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_schema_version_tracking() {
        let path = ".crucible/test_crucible_version.db";
        let _ = fs::remove_file(path);

        // Open twice - should not fail on second open
        let _db1 = CrucibleDb::open_at(path).unwrap();
        drop(_db1);

        let db2 = CrucibleDb::open_at(path).unwrap();
        let conn = db2.connection();
        let conn = conn.lock().unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(version, SCHEMA_VERSION);

        drop(conn);
        let _ = fs::remove_file(path);
    }
}
