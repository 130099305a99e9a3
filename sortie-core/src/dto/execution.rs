//! Execution DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::execution::ExecutionRecord;

/// Request to run one adhoc module against a set of hosts
///
/// Transient: only the echo fields end up on the [`ExecutionRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Target selector: a host pattern or group name
    #[serde(default)]
    pub hosts: String,
    /// Module to invoke, must be part of the supported catalog
    #[serde(default)]
    pub module: String,
    /// Free-form module arguments
    #[serde(default)]
    pub args: String,
    /// Inventory content, or the id of a saved inventory
    ///
    /// Empty falls back to the principal's default inventory, then the
    /// local default.
    #[serde(default)]
    pub inventory: String,
    #[serde(default)]
    pub extra_vars: HashMap<String, serde_json::Value>,
}

impl ExecutionRequest {
    pub fn new(hosts: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            hosts: hosts.into(),
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_inventory(mut self, inventory: impl Into<String>) -> Self {
        self.inventory = inventory.into();
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_vars.insert(key.into(), value);
        self
    }
}

/// Aggregate execution counts for one principal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    pub running_executions: i64,
    pub pending_executions: i64,
}

/// Result of probing the automation binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationStatus {
    pub installed: bool,
    pub binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One page of execution records, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPage {
    pub items: Vec<ExecutionRecord>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}
