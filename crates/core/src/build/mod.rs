//! # Build Subsystem
//!
//! Aggregation of granular code documents into buildable files, isolated
//! materialization, toolchain execution, and report rendering. The Enhanced
//! Builder agent drives these pieces as one state machine:
//!
//! ```text
//! Aggregating → Building → {NotifyingSuccess | NotifyingFailure} → Done
//! ```

pub mod aggregation;
pub mod executor;
pub mod report;
pub mod workspace;

pub use aggregation::{AggregatedFile, BuildAggregationResult, DocumentAggregator, StoreAggregator};
pub use executor::{
    BuildError, BuildErrorType, BuildExecutionResult, BuildExecutor, ProcessBuildExecutor,
};
pub use workspace::BuildWorkspace;
