//! Core domain types
//!
//! These types represent the durable entities of the engine and are shared
//! between the orchestrator (persistence, API) and the runner (execution).

pub mod execution;
pub mod inventory;
