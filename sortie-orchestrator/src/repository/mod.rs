//! Repository Module
//!
//! Record stores for executions and saved inventories. Services only talk
//! to the [`ExecutionRepository`] and [`InventoryRepository`] traits;
//! Postgres backs them in production and in-memory maps back them in
//! development and tests.

pub mod inventory;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sortie_core::domain::execution::{
    ExecutionRecord, ExecutionStatus, PrincipalId, UnknownStatus,
};
use sortie_core::domain::inventory::UnknownInventoryKind;
use sortie_core::dto::execution::{ExecutionRequest, ExecutionStats};
use thiserror::Error;
use uuid::Uuid;

pub use inventory::{
    InMemoryInventoryRepository, InventoryFields, InventoryRepository, PgInventoryRepository,
};
pub use memory::InMemoryExecutionRepository;
pub use postgres::PgExecutionRepository;

/// Repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("execution {0} not found")]
    NotFound(Uuid),

    #[error("execution {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    #[error("stored execution is invalid: {0}")]
    InvalidData(#[from] UnknownStatus),

    #[error("stored inventory is invalid: {0}")]
    InvalidInventory(#[from] UnknownInventoryKind),

    #[error("inventory name already exists: {0}")]
    DuplicateName(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fields of a freshly submitted execution
#[derive(Debug, Clone, PartialEq)]
pub struct NewExecution {
    pub command: String,
    pub module: String,
    pub args: String,
    pub inventory: String,
    pub hosts: String,
    pub extra_vars: Option<String>,
    pub user_id: PrincipalId,
}

impl NewExecution {
    /// Echoes a request into the fields persisted on the record
    pub fn from_request(
        req: &ExecutionRequest,
        user_id: PrincipalId,
    ) -> Result<Self, serde_json::Error> {
        let extra_vars = if req.extra_vars.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&req.extra_vars)?)
        };

        Ok(Self {
            command: ExecutionRecord::command_line(&req.hosts, &req.module),
            module: req.module.clone(),
            args: req.args.clone(),
            inventory: req.inventory.clone(),
            hosts: req.hosts.clone(),
            extra_vars,
            user_id,
        })
    }

    pub(crate) fn into_record(self, id: Uuid, now: DateTime<Utc>) -> ExecutionRecord {
        ExecutionRecord {
            id,
            command: self.command,
            module: self.module,
            args: self.args,
            inventory: self.inventory,
            hosts: self.hosts,
            extra_vars: self.extra_vars,
            status: ExecutionStatus::Pending,
            output: String::new(),
            error_output: String::new(),
            exit_code: None,
            start_time: None,
            end_time: None,
            duration: None,
            user_id: self.user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The single write that moves a running execution to its terminal state
///
/// The store derives `duration` from the stored `start_time` and
/// `end_time` within the same write.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalUpdate {
    pub status: ExecutionStatus,
    pub output: String,
    pub error_output: String,
    pub exit_code: i32,
    pub end_time: DateTime<Utc>,
}

/// Persistence operations on execution records
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Inserts a new record in `pending` state
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExecutionRecord>, RepositoryError>;

    /// `pending -> running`, recording the start time
    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// `running -> success | failed`, atomically with all result fields
    async fn complete(
        &self,
        id: Uuid,
        update: TerminalUpdate,
    ) -> Result<ExecutionRecord, RepositoryError>;

    /// Records owned by `user_id`, newest first, plus the total count
    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ExecutionRecord>, i64), RepositoryError>;

    async fn stats_for_user(&self, user_id: PrincipalId) -> Result<ExecutionStats, RepositoryError>;

    /// All records currently in `status`, oldest first
    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError>;
}

pub(crate) fn tally(stats: &mut ExecutionStats, status: ExecutionStatus, count: i64) {
    stats.total_executions += count;
    match status {
        ExecutionStatus::Pending => stats.pending_executions += count,
        ExecutionStatus::Running => stats.running_executions += count,
        ExecutionStatus::Success => stats.successful_executions += count,
        ExecutionStatus::Failed => stats.failed_executions += count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_execution_from_request() {
        let req = ExecutionRequest::new("web", "shell")
            .with_args("uptime")
            .with_var("port", serde_json::json!(22));

        let new = NewExecution::from_request(&req, 7).unwrap();

        assert_eq!(new.command, "ansible web -m shell");
        assert_eq!(new.args, "uptime");
        assert_eq!(new.extra_vars.as_deref(), Some(r#"{"port":22}"#));
        assert_eq!(new.user_id, 7);
    }

    #[test]
    fn test_empty_vars_are_not_serialized() {
        let req = ExecutionRequest::new("localhost", "ping");
        let new = NewExecution::from_request(&req, 1).unwrap();
        assert!(new.extra_vars.is_none());
    }

    #[test]
    fn test_into_record_starts_pending() {
        let now = Utc::now();
        let record = NewExecution::from_request(&ExecutionRequest::new("a", "ping"), 1)
            .unwrap()
            .into_record(Uuid::new_v4(), now);

        assert_eq!(record.status, ExecutionStatus::Pending);
        assert!(record.start_time.is_none());
        assert!(record.exit_code.is_none());
        assert_eq!(record.created_at, now);
    }
}
