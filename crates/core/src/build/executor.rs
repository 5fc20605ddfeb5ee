//! # Build Executor
//!
//! Capability that compiles a materialized file set and returns structured
//! diagnostics. Agents never receive unparsed logs; every defect becomes a
//! [`BuildError`] with a closed taxonomy so infrastructure failures and
//! genuine compile failures share one downstream shape.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Closed taxonomy of build defects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildErrorType {
    /// Syntax or type errors from the compiler
    CompilationError,
    /// Name resolution and semantic analysis failures
    SemanticError,
    /// Missing or conflicting package dependencies
    DependencyError,
    /// Infrastructure failure in the build system itself
    BuildSystemError,
}

impl BuildErrorType {
    /// Stable string form for reports and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompilationError => "CompilationError",
            Self::SemanticError => "SemanticError",
            Self::DependencyError => "DependencyError",
            Self::BuildSystemError => "BuildSystemError",
        }
    }
}

/// One structured build defect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildError {
    /// Defect taxonomy
    pub error_type: BuildErrorType,
    /// Short message
    pub message: String,
    /// Longer detail text
    #[serde(default)]
    pub detail: String,
    /// Stack trace when the toolchain produced one
    #[serde(default)]
    pub stack_trace: Option<String>,
    /// Offending function name
    #[serde(default)]
    pub function_name: Option<String>,
    /// Offending function signature
    #[serde(default)]
    pub function_signature: Option<String>,
    /// Line number within the owning file
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Severity, 1-10
    pub severity: u8,
    /// Suggested fix when the toolchain offered one
    #[serde(default)]
    pub suggested_fix: Option<String>,
    /// Other functions implicated in the defect
    #[serde(default)]
    pub related_functions: Vec<String>,
    /// Owning file
    #[serde(default)]
    pub file_name: Option<String>,
    /// Owning code unit
    #[serde(default)]
    pub code_unit: Option<String>,
}

impl BuildError {
    /// Create a defect with the default severity for its type
    pub fn new(error_type: BuildErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            detail: String::new(),
            stack_trace: None,
            function_name: None,
            function_signature: None,
            line_number: None,
            severity: 5,
            suggested_fix: None,
            related_functions: Vec::new(),
            file_name: None,
            code_unit: None,
        }
    }

    /// A synthetic infrastructure defect, severity 10
    pub fn build_system(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            severity: 10,
            detail: detail.clone(),
            ..Self::new(BuildErrorType::BuildSystemError, "Build system failure")
        }
    }

    /// Set the severity (clamped to 1-10)
    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = severity.clamp(1, 10);
        self
    }

    /// Set the detail text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Set the owning file and line
    pub fn with_location(mut self, file_name: impl Into<String>, line_number: u32) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }

    /// Set the suggested fix
    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// Result of one build attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildExecutionResult {
    /// Whether the build succeeded
    pub success: bool,
    /// Raw toolchain output
    pub output: String,
    /// Wall-clock duration of the attempt
    pub duration_ms: u64,
    /// Top-level error message when the attempt failed
    #[serde(default)]
    pub error_message: Option<String>,
    /// Structured defects, in discovery order
    #[serde(default)]
    pub errors: Vec<BuildError>,
    /// Paths of build-generated outputs, relative to the working area
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl BuildExecutionResult {
    /// A successful result with the given raw output
    pub fn succeeded(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: output.into(),
            duration_ms,
            error_message: None,
            errors: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// A failed result carrying structured defects
    pub fn failed(output: impl Into<String>, duration_ms: u64, errors: Vec<BuildError>) -> Self {
        Self {
            success: false,
            output: output.into(),
            duration_ms,
            error_message: Some(format!("Build failed with {} error(s)", errors.len())),
            errors,
            artifacts: Vec::new(),
        }
    }

    /// Normalize an infrastructure fault into a single severity-10 defect
    pub fn system_failure(error: &anyhow::Error) -> Self {
        let detail = format!("{:#}", error);
        Self {
            success: false,
            output: String::new(),
            duration_ms: 0,
            error_message: Some(detail.clone()),
            errors: vec![BuildError::build_system(detail)],
            artifacts: Vec::new(),
        }
    }
}

/// Capability: compile a materialized working area
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Build the files in `working_dir` with the toolchain for `language`
    async fn execute(
        &self,
        working_dir: &Path,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildExecutionResult>;
}

/// Toolchain command table: language -> (program, args)
fn toolchain_for(language: &str) -> Option<(&'static str, &'static [&'static str])> {
    match language {
        "csharp" => Some(("dotnet", &["build", "--nologo"])),
        "rust" => Some(("cargo", &["build", "--message-format=json"])),
        "typescript" | "javascript" => Some(("npm", &["run", "build"])),
        "go" => Some(("go", &["build", "./..."])),
        _ => None,
    }
}

/// Output directories scanned for build-generated artifacts
const ARTIFACT_DIRS: &[&str] = &["bin", "dist", "target/debug"];

/// Build executor that shells out to the language's toolchain
pub struct ProcessBuildExecutor;

impl ProcessBuildExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Collect build-generated output paths relative to the working area
    fn collect_artifacts(working_dir: &Path) -> Vec<String> {
        let mut artifacts = Vec::new();
        for dir in ARTIFACT_DIRS {
            let root = working_dir.join(dir);
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    if let Ok(rel) = entry.path().strip_prefix(working_dir) {
                        artifacts.push(rel.to_string_lossy().to_string());
                    }
                }
            }
        }
        artifacts.sort();
        artifacts
    }
}

impl Default for ProcessBuildExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildExecutor for ProcessBuildExecutor {
    async fn execute(
        &self,
        working_dir: &Path,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<BuildExecutionResult> {
        let (program, args) = toolchain_for(language)
            .with_context(|| format!("No toolchain registered for language '{}'", language))?;

        let started = Instant::now();

        let mut command = Command::new(program);
        command.args(args).current_dir(working_dir).kill_on_drop(true);

        tracing::debug!(%language, program, ?working_dir, "invoking build toolchain");

        let output = tokio::select! {
            out = command.output() => {
                out.with_context(|| format!("Failed to run {} {}", program, args.join(" ")))?
            }
            _ = cancel.cancelled() => {
                anyhow::bail!("build cancelled");
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let combined = format!("{}\n{}", stdout, stderr);

        if output.status.success() {
            let mut result = BuildExecutionResult::succeeded(combined, duration_ms);
            result.artifacts = Self::collect_artifacts(working_dir);
            return Ok(result);
        }

        let errors = match language {
            "rust" => parse_cargo_diagnostics(&stdout),
            _ => parse_text_diagnostics(&combined),
        };

        // A non-zero exit with nothing parseable is a toolchain problem,
        // not a compile failure.
        let errors = if errors.is_empty() {
            vec![BuildError::build_system(format!(
                "{} exited with {} but produced no parseable diagnostics",
                program, output.status
            ))]
        } else {
            errors
        };

        Ok(BuildExecutionResult::failed(combined, duration_ms, errors))
    }
}

/// Parse `cargo build --message-format=json` diagnostics
fn parse_cargo_diagnostics(stdout: &str) -> Vec<BuildError> {
    let mut errors = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Ok(msg) = serde_json::from_str::<CargoMessage>(line) {
            if let Some(message) = msg.message {
                if message.level != "error" {
                    continue;
                }
                let mut error =
                    BuildError::new(classify_rust_code(message.code.as_ref()), message.message);
                if let Some(span) = message.spans.first() {
                    error = error.with_location(span.file_name.clone(), span.line_start);
                }
                if let Some(rendered) = message.rendered {
                    error = error.with_detail(rendered);
                }
                errors.push(error.with_severity(7));
            }
        }
    }

    errors
}

fn classify_rust_code(code: Option<&DiagnosticCode>) -> BuildErrorType {
    match code.map(|c| c.code.as_str()) {
        // E0412/E0425/E0433: unresolved names and paths
        Some("E0412") | Some("E0425") | Some("E0433") => BuildErrorType::SemanticError,
        Some(c) if c.starts_with("E046") => BuildErrorType::DependencyError,
        _ => BuildErrorType::CompilationError,
    }
}

/// Parse textual `file(line,col): error CODE: message` diagnostics
/// (dotnet, tsc, and friends share this shape)
fn parse_text_diagnostics(output: &str) -> Vec<BuildError> {
    let pattern = match Regex::new(
        r"(?m)^\s*(?P<file>[^(\s][^(]*)\((?P<line>\d+),\d+\):\s+error\s+(?P<code>[A-Z]+\d+):\s+(?P<msg>.+)$",
    ) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(error = %e, "diagnostic pattern failed to compile");
            return Vec::new();
        }
    };

    let mut errors = Vec::new();
    for caps in pattern.captures_iter(output) {
        let code = caps.name("code").map(|m| m.as_str()).unwrap_or_default();
        let file = caps.name("file").map(|m| m.as_str()).unwrap_or_default();
        let message = caps.name("msg").map(|m| m.as_str()).unwrap_or_default();
        let line = caps
            .name("line")
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0);

        let error_type = if code.starts_with("NU") || code.starts_with("MSB") {
            BuildErrorType::DependencyError
        } else {
            BuildErrorType::CompilationError
        };

        errors.push(
            BuildError::new(error_type, message.to_string())
                .with_detail(format!("{} {}", code, message))
                .with_location(file.to_string(), line)
                .with_severity(7),
        );
    }

    errors
}

// --- Cargo JSON message types ---

#[derive(Debug, Deserialize)]
struct CargoMessage {
    message: Option<DiagnosticMessage>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticMessage {
    message: String,
    level: String,
    code: Option<DiagnosticCode>,
    #[serde(default)]
    spans: Vec<DiagnosticSpan>,
    rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct DiagnosticSpan {
    file_name: String,
    line_start: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotnet_diagnostics() {
        let output = r#"
  Determining projects to restore...
  UserService.cs(12,5): error CS1002: ; expected
  UserService.cs(30,9): error CS0246: The type or namespace name 'Foo' could not be found
"#;
        let errors = parse_text_diagnostics(output);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_type, BuildErrorType::CompilationError);
        assert_eq!(errors[0].file_name.as_deref(), Some("UserService.cs"));
        assert_eq!(errors[0].line_number, Some(12));
        assert!(errors[1].message.contains("could not be found"));
    }

    #[test]
    fn test_parse_dependency_diagnostics() {
        let output = "Project.csproj(1,1): error NU1101: Unable to find package Contoso.Widgets";
        let errors = parse_text_diagnostics(output);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, BuildErrorType::DependencyError);
    }

    #[test]
    fn test_parse_cargo_diagnostics() {
        let stdout = r#"{"reason":"compiler-message","message":{"message":"mismatched types","level":"error","code":{"code":"E0308"},"spans":[{"file_name":"src/lib.rs","line_start":7}],"rendered":"error[E0308]: mismatched types"}}
{"reason":"compiler-message","message":{"message":"unused variable","level":"warning","code":null,"spans":[],"rendered":null}}"#;
        let errors = parse_cargo_diagnostics(stdout);
        assert_eq!(errors.len(), 1, "warnings are not defects");
        assert_eq!(errors[0].line_number, Some(7));
    }

    #[test]
    fn test_system_failure_normalization() {
        let result = BuildExecutionResult::system_failure(&anyhow::anyhow!("disk full"));
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, BuildErrorType::BuildSystemError);
        assert_eq!(result.errors[0].severity, 10);
    }

    #[test]
    fn test_unknown_language_has_no_toolchain() {
        assert!(toolchain_for("cobol").is_none());
        assert!(toolchain_for("csharp").is_some());
    }

    #[test]
    fn test_severity_clamped() {
        let error = BuildError::new(BuildErrorType::CompilationError, "x").with_severity(0);
        assert_eq!(error.severity, 1);
        let error = BuildError::new(BuildErrorType::CompilationError, "x").with_severity(200);
        assert_eq!(error.severity, 10);
    }
}
