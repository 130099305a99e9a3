//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The tracker sits between the API, the record store and the runner.
//! Saved inventories feed the tracker when a request names none.

pub mod inventory;
pub mod live;
pub mod tracker;
pub mod validation;

pub use inventory::{InventoryError, InventoryService};
pub use tracker::{ExecutionTracker, TrackerError};
pub use validation::{ValidationError, validate_request};
