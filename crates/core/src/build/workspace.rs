//! # Build Workspace
//!
//! Isolated working area for one build attempt, keyed by project id plus a
//! fresh invocation id so concurrent attempts never interleave writes.

use super::aggregation::AggregatedFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Per-attempt scratch directory for materialized build inputs
pub struct BuildWorkspace {
    root: PathBuf,
}

impl BuildWorkspace {
    /// Create a workspace rooted at `{base}/{project_id}/{invocation_id}`
    pub fn new(base: &Path, project_id: &str, invocation_id: &str) -> Self {
        Self {
            root: base.join(project_id).join(invocation_id),
        }
    }

    /// The working directory for the build executor
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write every aggregated file into the working area
    pub async fn materialize(&self, files: &[AggregatedFile]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create working area {}", self.root.display()))?;

        for file in files {
            // File names come from generated documents; never let one
            // escape the working area.
            let relative = Path::new(&file.file_name);
            if relative.is_absolute()
                || relative
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                anyhow::bail!("File name escapes working area: {}", file.file_name);
            }

            let target = self.root.join(relative);

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory for {}", file.file_name))?;
            }

            tokio::fs::write(&target, &file.content)
                .await
                .with_context(|| format!("Failed to write {}", file.file_name))?;
        }

        Ok(())
    }

    /// Read a build-generated output as text (lossy for binary outputs)
    pub async fn read_output(&self, relative: &str) -> Result<String> {
        let path = self.root.join(relative);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read build output {}", relative))?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Best-effort removal of the working area
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            tracing::debug!(path = %self.root.display(), error = %e, "workspace cleanup skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file(name: &str, content: &str) -> AggregatedFile {
        AggregatedFile {
            file_name: name.to_string(),
            language: "csharp".to_string(),
            content: content.to_string(),
            code_unit: "Sample".to_string(),
            function_count: 1,
            total_size: content.len() as u64,
        }
    }

    #[tokio::test]
    async fn test_materialize_and_read() {
        let base = PathBuf::from(".crucible/test_ws");
        let ws = BuildWorkspace::new(&base, "proj-1", "inv-1");

        ws.materialize(&[
            sample_file("UserService.cs", "class UserService {}"),
            sample_file("Models/User.cs", "class User {}"),
        ])
        .await
        .unwrap();

        let content = ws.read_output("UserService.cs").await.unwrap();
        assert!(content.contains("UserService"));
        assert!(ws.path().join("Models/User.cs").is_file());

        ws.cleanup();
        assert!(!ws.path().exists());
        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn test_escaping_file_names_are_rejected() {
        let base = PathBuf::from(".crucible/test_ws_escape");
        let ws = BuildWorkspace::new(&base, "proj-1", "inv-1");

        let result = ws.materialize(&[sample_file("../evil.cs", "boom")]).await;
        assert!(result.is_err());

        ws.cleanup();
        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn test_workspaces_are_isolated_per_project() {
        let base = PathBuf::from(".crucible/test_ws_iso");
        let ws_a = BuildWorkspace::new(&base, "proj-a", "inv-1");
        let ws_b = BuildWorkspace::new(&base, "proj-b", "inv-1");

        ws_a.materialize(&[sample_file("A.cs", "class A {}")]).await.unwrap();
        ws_b.materialize(&[sample_file("B.cs", "class B {}")]).await.unwrap();

        assert_ne!(ws_a.path(), ws_b.path());
        assert!(ws_a.path().join("A.cs").is_file());
        assert!(!ws_a.path().join("B.cs").exists());
        assert!(ws_b.path().join("B.cs").is_file());

        ws_a.cleanup();
        ws_b.cleanup();
        let _ = std::fs::remove_dir_all(&base);
    }
}
