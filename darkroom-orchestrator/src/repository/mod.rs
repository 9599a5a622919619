//! Repository Module
//!
//! Postgres-backed implementations of the run-state store and the read-only
//! project store.

pub mod project;
pub mod state;

pub use project::PgProjectStore;
pub use state::PgRunStateStore;
