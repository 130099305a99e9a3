//! Data Transfer Objects
//!
//! Requests and aggregates exchanged between the HTTP layer and the
//! execution tracker.

pub mod execution;
pub mod inventory;
