//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The pipeline service owns the run state machine; the decision module is
//! its pure intake decision table.

pub mod decision;
pub mod pipeline;

// Re-export for convenience
pub use pipeline as pipeline_service;
