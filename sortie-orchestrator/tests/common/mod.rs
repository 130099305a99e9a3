#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sortie_core::domain::execution::{ExecutionRecord, ExecutionStatus, PrincipalId};
use sortie_core::dto::execution::ExecutionStats;
use sortie_orchestrator::repository::{
    ExecutionRepository, InMemoryExecutionRepository, NewExecution, RepositoryError,
    TerminalUpdate,
};
use sortie_orchestrator::service::{ExecutionTracker, InventoryService};
use sortie_runner::{AdhocRunner, RunnerConfig};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// Writes an executable shell script standing in for `ansible`
pub fn fake_binary(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-ansible");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn runner_config(dir: &Path, binary: &Path, timeout: Duration) -> RunnerConfig {
    RunnerConfig::new(dir)
        .with_binary_path(binary)
        .with_temp_dir(dir.join("artifacts"))
        .with_timeout(timeout)
        .with_verbose(false)
}

pub struct Harness {
    pub dir: TempDir,
    pub repo: Arc<RecordingRepository>,
    pub inventories: InventoryService,
    pub tracker: ExecutionTracker,
}

impl Harness {
    /// Tracker over an in-memory store, running `script` as the binary
    pub fn new(script: &str, timeout: Duration, max_concurrent: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path(), script);
        let runner = AdhocRunner::new(runner_config(dir.path(), &binary, timeout)).unwrap();
        let repo = Arc::new(RecordingRepository::default());
        let inventories = InventoryService::in_memory();
        let tracker = ExecutionTracker::with_inventories(
            repo.clone(),
            Arc::new(runner),
            inventories.clone(),
            max_concurrent,
        );

        Self {
            dir,
            repo,
            inventories,
            tracker,
        }
    }

    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("artifacts"))
            .unwrap()
            .count()
    }
}

/// In-memory store that remembers every status it was asked to write
#[derive(Default)]
pub struct RecordingRepository {
    inner: InMemoryExecutionRepository,
    writes: Mutex<Vec<(Uuid, ExecutionStatus)>>,
}

impl RecordingRepository {
    fn record(&self, id: Uuid, status: ExecutionStatus) {
        self.writes.lock().unwrap().push((id, status));
    }

    /// Statuses written for `id`, in order
    pub fn history(&self, id: Uuid) -> Vec<ExecutionStatus> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(w, _)| *w == id)
            .map(|(_, s)| *s)
            .collect()
    }
}

#[async_trait]
impl ExecutionRepository for RecordingRepository {
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, RepositoryError> {
        let record = self.inner.create(new).await?;
        self.record(record.id, record.status);
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExecutionRecord>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.mark_running(id, started_at).await?;
        self.record(id, ExecutionStatus::Running);
        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        update: TerminalUpdate,
    ) -> Result<ExecutionRecord, RepositoryError> {
        let record = self.inner.complete(id, update).await?;
        self.record(id, record.status);
        Ok(record)
    }

    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ExecutionRecord>, i64), RepositoryError> {
        self.inner.list_by_user(user_id, offset, limit).await
    }

    async fn stats_for_user(&self, user_id: PrincipalId) -> Result<ExecutionStats, RepositoryError> {
        self.inner.stats_for_user(user_id).await
    }

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        self.inner.find_by_status(status).await
    }
}
