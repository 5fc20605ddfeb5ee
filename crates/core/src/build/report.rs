//! # Build Reports
//!
//! Markdown rendering of build outcomes. Every build attempt, successful or
//! not, yields a complete human-readable report.

use super::aggregation::BuildAggregationResult;
use super::executor::BuildExecutionResult;

/// Render the report for a successful build
pub fn success_report(
    aggregation: &BuildAggregationResult,
    execution: &BuildExecutionResult,
) -> String {
    let mut report = String::from("# Build Report\n\n**Status:** Success\n\n");

    report.push_str(&format!(
        "- Documents aggregated: {}\n- Code units: {}\n- Files built: {}\n- Duration: {} ms\n\n",
        aggregation.document_count,
        aggregation.code_unit_count,
        aggregation.files.len(),
        execution.duration_ms,
    ));

    report.push_str("## Files\n\n| File | Code Unit | Functions | Size |\n|---|---|---|---|\n");
    for file in &aggregation.files {
        report.push_str(&format!(
            "| {} | {} | {} | {} B |\n",
            file.file_name, file.code_unit, file.function_count, file.total_size
        ));
    }

    if !execution.artifacts.is_empty() {
        report.push_str("\n## Generated Artifacts\n\n");
        for artifact in &execution.artifacts {
            report.push_str(&format!("- `{}`\n", artifact));
        }
    }

    report
}

/// Render the report for a failed build
pub fn failure_report(
    aggregation: &BuildAggregationResult,
    execution: &BuildExecutionResult,
) -> String {
    let mut report = String::from("# Build Report\n\n**Status:** Failed\n\n");

    report.push_str(&format!(
        "- Files attempted: {}\n- Errors: {}\n- Duration: {} ms\n\n",
        aggregation.files.len(),
        execution.errors.len(),
        execution.duration_ms,
    ));

    report.push_str("## Errors\n\n");
    for (index, error) in execution.errors.iter().enumerate() {
        report.push_str(&format!(
            "### {}. {} (severity {})\n\n{}\n\n",
            index + 1,
            error.error_type.as_str(),
            error.severity,
            error.message,
        ));
        if let (Some(file), Some(line)) = (&error.file_name, error.line_number) {
            report.push_str(&format!("- Location: `{}:{}`\n", file, line));
        }
        if let Some(fix) = &error.suggested_fix {
            report.push_str(&format!("- Suggested fix: {}\n", fix));
        }
        report.push('\n');
    }

    report
}

/// Render the report for an aggregation that never reached the build
pub fn aggregation_failure_report(message: &str) -> String {
    format!(
        "# Build Report\n\n**Status:** Not attempted\n\nAggregation failed: {}\n",
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::executor::{BuildError, BuildErrorType};

    fn aggregation() -> BuildAggregationResult {
        BuildAggregationResult {
            success: true,
            message: "ok".to_string(),
            document_count: 3,
            code_unit_count: 2,
            languages: vec!["csharp".to_string()],
            files: vec![crate::build::AggregatedFile {
                file_name: "UserService.cs".to_string(),
                language: "csharp".to_string(),
                content: "class UserService {}".to_string(),
                code_unit: "UserService".to_string(),
                function_count: 4,
                total_size: 20,
            }],
        }
    }

    #[test]
    fn test_success_report_lists_files() {
        let execution = BuildExecutionResult::succeeded("done", 12_000);
        let report = success_report(&aggregation(), &execution);
        assert!(report.contains("**Status:** Success"));
        assert!(report.contains("UserService.cs"));
        assert!(report.contains("12000 ms"));
    }

    #[test]
    fn test_failure_report_lists_errors() {
        let errors = vec![
            BuildError::new(BuildErrorType::CompilationError, "; expected")
                .with_location("UserService.cs", 12)
                .with_severity(7),
            BuildError::new(BuildErrorType::SemanticError, "unknown type 'Foo'").with_severity(4),
        ];
        let execution = BuildExecutionResult::failed("output", 8_000, errors);
        let report = failure_report(&aggregation(), &execution);
        assert!(report.contains("**Status:** Failed"));
        assert!(report.contains("CompilationError (severity 7)"));
        assert!(report.contains("`UserService.cs:12`"));
        assert!(report.contains("unknown type 'Foo'"));
    }

    #[test]
    fn test_aggregation_failure_report() {
        let report = aggregation_failure_report("no documents");
        assert!(report.contains("Not attempted"));
        assert!(report.contains("no documents"));
    }
}
