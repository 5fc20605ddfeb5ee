//! # Build Aggregation
//!
//! Collapses many granular code documents into buildable files. One
//! [`BuildAggregationResult`] is produced per build attempt and discarded
//! once the attempt finishes.

use crate::state::{CrucibleDb, DocumentManager};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One buildable file assembled from granular documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedFile {
    /// File name, relative to the working area
    pub file_name: String,
    /// Source language
    pub language: String,
    /// Assembled content
    pub content: String,
    /// Owning code unit
    pub code_unit: String,
    /// Total functions contributed by the source documents
    pub function_count: u32,
    /// Assembled content size in bytes
    pub total_size: u64,
}

/// Result of grouping a project's documents into buildable files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildAggregationResult {
    /// Whether aggregation succeeded
    pub success: bool,
    /// Human-readable summary or failure reason
    pub message: String,
    /// Total source documents consumed
    pub document_count: u32,
    /// Total logical code units seen
    pub code_unit_count: u32,
    /// Languages present, in first-seen order
    pub languages: Vec<String>,
    /// Buildable files, in stable grouping order
    pub files: Vec<AggregatedFile>,
}

impl BuildAggregationResult {
    /// A failed aggregation carrying only its reason
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            document_count: 0,
            code_unit_count: 0,
            languages: Vec::new(),
            files: Vec::new(),
        }
    }

    /// The dominant language: first one encountered in the aggregated set
    pub fn dominant_language(&self) -> Option<&str> {
        self.languages.first().map(|s| s.as_str())
    }
}

/// Capability: group a project's granular documents into buildable files
#[async_trait]
pub trait DocumentAggregator: Send + Sync {
    async fn aggregate_for_build(
        &self,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildAggregationResult>;
}

/// Aggregator over the Crucible document store
///
/// Documents sharing a file name are concatenated in insertion order; the
/// first document of a file decides its code unit and language.
pub struct StoreAggregator {
    db: Arc<CrucibleDb>,
}

impl StoreAggregator {
    pub fn new(db: Arc<CrucibleDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentAggregator for StoreAggregator {
    async fn aggregate_for_build(
        &self,
        project_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildAggregationResult> {
        if cancel.is_cancelled() {
            anyhow::bail!("aggregation cancelled");
        }

        let documents = DocumentManager::new(&self.db).list_for_project(project_id)?;

        if documents.is_empty() {
            return Ok(BuildAggregationResult::failure(format!(
                "No code documents found for project {}",
                project_id
            )));
        }

        let mut files: Vec<AggregatedFile> = Vec::new();
        let mut languages: Vec<String> = Vec::new();
        let mut code_units: Vec<String> = Vec::new();

        for document in &documents {
            if !languages.contains(&document.language) {
                languages.push(document.language.clone());
            }
            if !code_units.contains(&document.code_unit) {
                code_units.push(document.code_unit.clone());
            }

            match files.iter_mut().find(|f| f.file_name == document.file_name) {
                Some(file) => {
                    file.content.push('\n');
                    file.content.push_str(&document.content);
                    file.function_count += document.function_count;
                    file.total_size = file.content.len() as u64;
                }
                None => {
                    files.push(AggregatedFile {
                        file_name: document.file_name.clone(),
                        language: document.language.clone(),
                        content: document.content.clone(),
                        code_unit: document.code_unit.clone(),
                        function_count: document.function_count,
                        total_size: document.content.len() as u64,
                    });
                }
            }
        }

        tracing::debug!(
            project = project_id,
            documents = documents.len(),
            files = files.len(),
            "aggregated documents into buildable files"
        );

        Ok(BuildAggregationResult {
            success: true,
            message: format!(
                "Aggregated {} document(s) into {} file(s)",
                documents.len(),
                files.len()
            ),
            document_count: documents.len() as u32,
            code_unit_count: code_units.len() as u32,
            languages,
            files,
        })
    }
}
