//! # State Management
//!
//! SQLite-backed persistence for Crucible: granular code documents, designer
//! outputs, and pipeline execution records all live in one database.

pub mod db;
pub mod designs;
pub mod documents;

pub use db::CrucibleDb;
pub use designs::{DesignOutput, DesignOutputStore, SqliteDesignStore, StorageError};
pub use documents::{CodeDocument, DocumentManager};
