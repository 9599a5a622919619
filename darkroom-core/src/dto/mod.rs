//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs used for communication between Darkroom services:
//! the tool queue wire messages consumed by the worker fleet, the notifications
//! pushed to the owning user's live session, and the run lifecycle reports
//! returned to API callers.

pub mod notify;
pub mod queue;
pub mod run;
