//! # Crucible Core
//!
//! The "Foundry" of the Crucible system - agent runtime, build feedback
//! loop, and state management for a pipeline that turns a project
//! specification into built software artifacts.
//!
//! ## Architecture
//!
//! - `agents/` - agent lifecycle contract, stage variants, and the registry
//! - `build/` - aggregation, isolated materialization, toolchain execution
//! - `messaging/` - builder notification/error envelopes and delivery
//! - `models/` - LLM and swarm configuration, the model invocation seam
//! - `pipeline/` - stage machine, execution records, and the stage runner
//! - `state/` - SQLite persistence for documents, designs, and executions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crucible_core::agents::{default_registry, Capabilities};
//! use crucible_core::pipeline::{PipelineStage, StageRunner};
//!
//! let registry = default_registry(capabilities);
//! let runner = StageRunner::new(registry.into(), db, config);
//! let results = runner.run_stage(PipelineStage::Building, &context, &cancel).await?;
//! ```

pub mod agents;
pub mod build;
pub mod fakes;
pub mod messaging;
pub mod models;
pub mod pipeline;
pub mod state;
