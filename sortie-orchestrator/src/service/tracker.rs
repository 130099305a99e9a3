//! Execution tracker
//!
//! Owns the lifecycle of every submitted execution. `submit` returns the
//! pending record immediately; a background task tracked by a
//! [`TaskTracker`] then moves the record to `running`, drives the runner and
//! writes exactly one terminal state.
//!
//! Idle waits count in-flight executions separately, so they never touch
//! the task tracker that shutdown closes.

use chrono::Utc;
use sortie_core::domain::execution::{
    ExecutionRecord, ExecutionStatus, PrincipalId, UNKNOWN_EXIT_CODE,
};
use sortie_core::dto::execution::{
    ExecutionPage, ExecutionRequest, ExecutionStats, InstallationStatus,
};
use sortie_runner::{CommandRunner, ProcessOutcome, RunnerError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinError;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::repository::{ExecutionRepository, NewExecution, RepositoryError, TerminalUpdate};
use crate::service::inventory::{InventoryError, InventoryService};
use crate::service::live::LiveOutput;
use crate::service::validation::{ValidationError, validate_request};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

const INTERRUPTED_MESSAGE: &str = "execution interrupted by server restart";

/// Tracker error type
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("execution {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("serialize extra vars failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

struct Inner {
    repo: Arc<dyn ExecutionRepository>,
    runner: Arc<dyn CommandRunner>,
    inventories: InventoryService,
    live: LiveOutput,
    tasks: TaskTracker,
    slots: Arc<Semaphore>,
    in_flight: watch::Sender<usize>,
}

/// Counts one execution as in flight until dropped
struct InFlight(Arc<Inner>);

impl InFlight {
    fn new(inner: Arc<Inner>) -> Self {
        inner.in_flight.send_modify(|n| *n += 1);
        Self(inner)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n -= 1);
    }
}

/// Cheap to clone; all clones share the same executions
#[derive(Clone)]
pub struct ExecutionTracker {
    inner: Arc<Inner>,
}

impl ExecutionTracker {
    /// Creates a tracker running at most `max_concurrent` processes at once
    ///
    /// Saved inventories live in a private in-memory store.
    pub fn new(
        repo: Arc<dyn ExecutionRepository>,
        runner: Arc<dyn CommandRunner>,
        max_concurrent: usize,
    ) -> Self {
        Self::with_inventories(repo, runner, InventoryService::in_memory(), max_concurrent)
    }

    /// Creates a tracker resolving request inventories through `inventories`
    pub fn with_inventories(
        repo: Arc<dyn ExecutionRepository>,
        runner: Arc<dyn CommandRunner>,
        inventories: InventoryService,
        max_concurrent: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                runner,
                inventories,
                live: LiveOutput::new(),
                tasks: TaskTracker::new(),
                slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
                in_flight: watch::Sender::new(0),
            }),
        }
    }

    /// Validates and records a request, then dispatches it in the background
    ///
    /// The request's inventory is resolved to content first; the record
    /// keeps the content that was run. Returns the `pending` record without
    /// waiting for the process.
    pub async fn submit(
        &self,
        mut request: ExecutionRequest,
        principal: PrincipalId,
    ) -> Result<ExecutionRecord, TrackerError> {
        validate_request(&request)?;

        request.inventory = self
            .inner
            .inventories
            .resolve(principal, &request.inventory)
            .await?;

        let new = NewExecution::from_request(&request, principal)?;
        let record = self.inner.repo.create(new).await?;

        info!(
            execution_id = %record.id,
            module = %record.module,
            hosts = %record.hosts,
            user_id = principal,
            "Execution submitted"
        );

        self.inner.live.open(record.id);
        let in_flight = InFlight::new(Arc::clone(&self.inner));
        self.inner.tasks.spawn(drive(in_flight, record.id, request));

        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<ExecutionRecord, TrackerError> {
        self.inner
            .repo
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::NotFound(id))
    }

    /// Page of the principal's executions, newest first
    pub async fn list(
        &self,
        principal: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<ExecutionPage, TrackerError> {
        let offset = offset.max(0);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let (items, total) = self.inner.repo.list_by_user(principal, offset, limit).await?;

        Ok(ExecutionPage {
            items,
            total,
            offset,
            limit,
        })
    }

    pub async fn stats(&self, principal: PrincipalId) -> Result<ExecutionStats, TrackerError> {
        Ok(self.inner.repo.stats_for_user(principal).await?)
    }

    /// Stdout lines captured so far, `None` once the execution is terminal
    pub fn live_output(&self, id: Uuid) -> Option<Vec<String>> {
        self.inner.live.snapshot(id)
    }

    /// Runs the automation binary with `--version`
    pub async fn check_installation(&self) -> InstallationStatus {
        let binary = self.inner.runner.binary().display().to_string();

        match self.inner.runner.check_installation().await {
            Ok(version) => InstallationStatus {
                installed: true,
                binary,
                version: Some(version),
                error: None,
            },
            Err(e) => {
                warn!(binary = %binary, error = %e, "Ansible installation check failed");
                InstallationStatus {
                    installed: false,
                    binary,
                    version: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Waits until no execution is in flight
    pub async fn wait_idle(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        // The sender lives in `inner`, the receiver never sees it closed
        let _ = in_flight.wait_for(|n| *n == 0).await;
    }

    /// Waits for in-flight executions during graceful shutdown
    pub async fn shutdown(&self) {
        let in_flight = self.inner.tasks.len();
        if in_flight > 0 {
            info!(in_flight, "Waiting for in-flight executions");
        }
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }

    /// Fails every execution left `pending` or `running` by a previous process
    ///
    /// Must run before the API accepts requests.
    pub async fn reconcile_interrupted(&self) -> Result<u64, TrackerError> {
        let repo = &self.inner.repo;
        let mut reconciled = 0;

        for record in repo.find_by_status(ExecutionStatus::Running).await? {
            self.interrupt(record).await?;
            reconciled += 1;
        }

        for record in repo.find_by_status(ExecutionStatus::Pending).await? {
            repo.mark_running(record.id, Utc::now()).await?;
            self.interrupt(record).await?;
            reconciled += 1;
        }

        if reconciled > 0 {
            warn!(count = reconciled, "Marked interrupted executions as failed");
        }

        Ok(reconciled)
    }

    async fn interrupt(&self, record: ExecutionRecord) -> Result<(), TrackerError> {
        let update = TerminalUpdate {
            status: ExecutionStatus::Failed,
            output: record.output,
            error_output: INTERRUPTED_MESSAGE.to_string(),
            exit_code: UNKNOWN_EXIT_CODE,
            end_time: Utc::now(),
        };
        self.inner.repo.complete(record.id, update).await?;
        debug!(execution_id = %record.id, "Interrupted execution reconciled");
        Ok(())
    }
}

/// Background half of an execution
async fn drive(in_flight: InFlight, id: Uuid, request: ExecutionRequest) {
    let inner = &in_flight.0;

    // Semaphore is never closed
    let Ok(_permit) = Arc::clone(&inner.slots).acquire_owned().await else {
        inner.live.close(id);
        return;
    };

    if let Err(e) = inner.repo.mark_running(id, Utc::now()).await {
        error!(execution_id = %id, error = %e, "Failed to mark execution running");
        inner.live.close(id);
        return;
    }

    debug!(execution_id = %id, "Execution running");

    let (sink, mut lines) = mpsc::unbounded_channel::<String>();
    let live = inner.live.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            live.push(id, line);
        }
    });

    let runner = Arc::clone(&inner.runner);
    let timeout = runner.timeout();
    let run = tokio::spawn(async move { runner.run_adhoc(&request, Some(sink)).await });

    let update = terminal_update(run.await, timeout);

    if let Err(e) = forwarder.await {
        warn!(execution_id = %id, error = %e, "Live output forwarder failed");
    }

    match inner.repo.complete(id, update).await {
        Ok(record) => info!(
            execution_id = %id,
            status = %record.status,
            exit_code = record.exit_code,
            duration = record.duration,
            "Execution finished"
        ),
        Err(e) => error!(execution_id = %id, error = %e, "Failed to record execution result"),
    }

    inner.live.close(id);
}

/// Maps whatever the runner task produced to the terminal write
fn terminal_update(
    result: Result<Result<ProcessOutcome, RunnerError>, JoinError>,
    timeout: Duration,
) -> TerminalUpdate {
    match result {
        Ok(Ok(outcome)) => {
            let mut error_output = outcome.error_output();
            if outcome.timed_out {
                if !error_output.is_empty() {
                    error_output.push('\n');
                }
                error_output.push_str(&format!(
                    "execution timed out after {}s",
                    timeout.as_secs()
                ));
            }

            TerminalUpdate {
                status: if outcome.success {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Failed
                },
                output: outcome.output(),
                error_output,
                exit_code: outcome.exit_code,
                end_time: outcome.ended_at,
            }
        }
        Ok(Err(e)) => failed(e.to_string()),
        Err(e) => failed(format!("execution task panicked: {}", e)),
    }
}

fn failed(error_output: String) -> TerminalUpdate {
    TerminalUpdate {
        status: ExecutionStatus::Failed,
        output: String::new(),
        error_output,
        exit_code: UNKNOWN_EXIT_CODE,
        end_time: Utc::now(),
    }
}
