//! # Code Document Store
//!
//! Granular code documents produced by the generation stages. Each document
//! is one logical chunk of a file (a code unit's contribution); the build
//! aggregator groups them back into buildable files.

use super::db::CrucibleDb;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A granular generated code document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDocument {
    /// Unique document identifier
    pub id: String,
    /// Owning project
    pub project_id: String,
    /// Logical code unit this document belongs to (e.g., "UserService")
    pub code_unit: String,
    /// File the document will be materialized into
    pub file_name: String,
    /// Source language
    pub language: String,
    /// Document content
    pub content: String,
    /// Number of functions defined in this document
    pub function_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl CodeDocument {
    /// Create a new document for a project
    pub fn new(
        project_id: impl Into<String>,
        code_unit: impl Into<String>,
        file_name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_document_id(),
            project_id: project_id.into(),
            code_unit: code_unit.into(),
            file_name: file_name.into(),
            language: language.into(),
            content: content.into(),
            function_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the function count
    pub fn with_function_count(mut self, count: u32) -> Self {
        self.function_count = count;
        self
    }
}

/// Manager for code document storage in SQLite
pub struct DocumentManager {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl DocumentManager {
    /// Create a new DocumentManager from a CrucibleDb
    pub fn new(db: &CrucibleDb) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    /// Save (upsert) a document
    pub fn save(&self, document: &CodeDocument) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO code_documents
            (id, project_id, code_unit, file_name, language, content, function_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                document.id,
                document.project_id,
                document.code_unit,
                document.file_name,
                document.language,
                document.content,
                document.function_count,
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to save code document")?;

        Ok(())
    }

    /// List all documents for a project, in insertion order
    pub fn list_for_project(&self, project_id: &str) -> Result<Vec<CodeDocument>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, project_id, code_unit, file_name, language, content, function_count, created_at, updated_at
            FROM code_documents
            WHERE project_id = ?1
            ORDER BY created_at, id
            "#,
        )?;

        let documents = stmt
            .query_map(params![project_id], |row| Ok(Self::row_to_document(row)?))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list code documents")?;

        Ok(documents)
    }

    /// Count documents for a project
    pub fn count_for_project(&self, project_id: &str) -> Result<u32> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM code_documents WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Delete all documents for a project
    pub fn delete_for_project(&self, project_id: &str) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let deleted = conn.execute(
            "DELETE FROM code_documents WHERE project_id = ?1",
            params![project_id],
        )?;

        Ok(deleted)
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<CodeDocument> {
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(CodeDocument {
            id: row.get(0)?,
            project_id: row.get(1)?,
            code_unit: row.get(2)?,
            file_name: row.get(3)?,
            language: row.get(4)?,
            content: row.get(5)?,
            function_count: row.get(6)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// Generate a unique document ID (timestamp plus entropy suffix)
fn generate_document_id() -> String {
    format!("doc-{}", crate::messaging::unique_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_document_round_trip() {
        let path = ".crucible/test_documents.db";
        let _ = fs::remove_file(path);

        let db = CrucibleDb::open_at(path).unwrap();
        let mgr = DocumentManager::new(&db);

        let doc = CodeDocument::new("proj-1", "UserService", "UserService.cs", "csharp", "class UserService {}")
            .with_function_count(4);
        mgr.save(&doc).unwrap();

        let docs = mgr.list_for_project("proj-1").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].code_unit, "UserService");
        assert_eq!(docs[0].function_count, 4);

        assert_eq!(mgr.count_for_project("proj-1").unwrap(), 1);
        assert_eq!(mgr.count_for_project("proj-2").unwrap(), 0);

        assert_eq!(mgr.delete_for_project("proj-1").unwrap(), 1);
        assert!(mgr.list_for_project("proj-1").unwrap().is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_document_ids_are_unique() {
        let a = CodeDocument::new("p", "U", "U.cs", "csharp", "");
        let b = CodeDocument::new("p", "U", "U.cs", "csharp", "");
        assert_ne!(a.id, b.id);
    }
}
