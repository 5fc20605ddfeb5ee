//! # Pipeline Stages
//!
//! Defines the ordered stages of the generation pipeline.

use serde::{Deserialize, Serialize};

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Planner turning the specification into a plan
    #[default]
    Planning,
    /// Designer producing the technical design
    Designing,
    /// Swarm dispatching per-unit missions
    Swarming,
    /// Enhanced builder aggregating and building
    Building,
    /// Validator reviewing the outcome
    Validating,
    /// Complete
    Complete,
    /// Failed
    Failed,
}

impl PipelineStage {
    /// Advance to the next stage
    pub fn advance(&mut self) {
        *self = match self {
            PipelineStage::Planning => PipelineStage::Designing,
            PipelineStage::Designing => PipelineStage::Swarming,
            PipelineStage::Swarming => PipelineStage::Building,
            PipelineStage::Building => PipelineStage::Validating,
            PipelineStage::Validating => PipelineStage::Complete,
            PipelineStage::Complete => PipelineStage::Complete,
            PipelineStage::Failed => PipelineStage::Failed,
        };
    }

    /// Fail the pipeline
    pub fn fail(&mut self) {
        *self = PipelineStage::Failed;
    }

    /// Check if the pipeline has terminated
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Complete | PipelineStage::Failed)
    }

    /// Check if the pipeline succeeded
    pub fn is_success(&self) -> bool {
        *self == PipelineStage::Complete
    }

    /// Stable string form used as the registry's stage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Designing => "Designing",
            Self::Swarming => "Swarming",
            Self::Building => "Building",
            Self::Validating => "Validating",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Parse from the stable string form
    pub fn from_str(s: &str) -> Self {
        match s {
            "Designing" => Self::Designing,
            "Swarming" => Self::Swarming,
            "Building" => Self::Building,
            "Validating" => Self::Validating,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            _ => Self::Planning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_advance() {
        let mut stage = PipelineStage::Planning;

        stage.advance();
        assert_eq!(stage, PipelineStage::Designing);

        stage.advance();
        stage.advance();
        assert_eq!(stage, PipelineStage::Building);

        stage.advance();
        stage.advance();
        assert_eq!(stage, PipelineStage::Complete);
        assert!(stage.is_terminal());
        assert!(stage.is_success());

        // Terminal stages are absorbing
        stage.advance();
        assert_eq!(stage, PipelineStage::Complete);
    }

    #[test]
    fn test_failed_stage_is_absorbing() {
        let mut stage = PipelineStage::Building;
        stage.fail();
        assert_eq!(stage, PipelineStage::Failed);
        assert!(stage.is_terminal());
        assert!(!stage.is_success());

        stage.advance();
        assert_eq!(stage, PipelineStage::Failed);
    }

    #[test]
    fn test_stage_string_round_trip() {
        for stage in [
            PipelineStage::Planning,
            PipelineStage::Designing,
            PipelineStage::Swarming,
            PipelineStage::Building,
            PipelineStage::Validating,
            PipelineStage::Complete,
            PipelineStage::Failed,
        ] {
            assert_eq!(PipelineStage::from_str(stage.as_str()), stage);
        }
    }
}
