//! Darkroom Core
//!
//! Core types and abstractions for the Darkroom image pipeline system.
//!
//! This crate contains:
//! - Domain types: Core business entities (ToolChainEntry, StepCursor, artifacts, etc.)
//! - DTOs: Data transfer objects for the tool queue and client notifications

pub mod domain;
pub mod dto;
