//! Execution domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of the authenticated principal that owns an execution.
pub type PrincipalId = i64;

/// Exit code recorded when no process exit status is available
/// (launch failure, preparation failure, signal termination).
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Durable record of one adhoc execution
///
/// Written only by the execution tracker; API callers observe snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    /// Human readable echo of the invocation, e.g. `ansible web -m ping`
    pub command: String,
    pub module: String,
    pub args: String,
    pub inventory: String,
    pub hosts: String,
    /// Variable set serialized as JSON, `None` when the request had none
    pub extra_vars: Option<String>,
    pub status: ExecutionStatus,
    pub output: String,
    pub error_output: String,
    pub exit_code: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between `start_time` and `end_time`
    pub duration: Option<i64>,
    pub user_id: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Builds the `command` echo stored alongside a record.
    pub fn command_line(hosts: &str, module: &str) -> String {
        format!("ansible {} -m {}", hosts, module)
    }
}

/// Lifecycle status of an execution
///
/// Transitions are monotonic: `Pending -> Running -> {Success, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 4] = [
        ExecutionStatus::Pending,
        ExecutionStatus::Running,
        ExecutionStatus::Success,
        ExecutionStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }

    /// No further transitions happen after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }

    /// Whether `self -> next` is a legal single step of the lifecycle.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Running, ExecutionStatus::Success)
                | (ExecutionStatus::Running, ExecutionStatus::Failed)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ExecutionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Duration in whole seconds between two instants, truncated toward zero.
///
/// Negative spans (clock skew) are clamped to zero.
pub fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0)
}
