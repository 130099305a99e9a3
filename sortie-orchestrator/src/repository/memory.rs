//! In-memory execution store
//!
//! Used when no database is configured and by tests. Every operation runs
//! under one lock, so terminal updates are observed all-or-nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sortie_core::domain::execution::{
    ExecutionRecord, ExecutionStatus, PrincipalId, duration_seconds,
};
use sortie_core::dto::execution::ExecutionStats;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{ExecutionRepository, NewExecution, RepositoryError, TerminalUpdate, tally};

#[derive(Debug, Default)]
struct Store {
    records: HashMap<Uuid, Entry>,
    next_seq: u64,
}

#[derive(Debug)]
struct Entry {
    // Insertion order breaks ties between equal `created_at` values
    seq: u64,
    record: ExecutionRecord,
}

#[derive(Debug, Default)]
pub struct InMemoryExecutionRepository {
    store: Mutex<Store>,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut store)
    }
}

fn transition(
    entry: &mut Entry,
    to: ExecutionStatus,
) -> Result<&mut ExecutionRecord, RepositoryError> {
    let record = &mut entry.record;
    if !record.status.can_transition_to(to) {
        return Err(RepositoryError::InvalidTransition {
            id: record.id,
            from: record.status,
            to,
        });
    }
    record.status = to;
    Ok(record)
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, RepositoryError> {
        let record = new.into_record(Uuid::new_v4(), Utc::now());

        self.with_store(|store| {
            let seq = store.next_seq;
            store.next_seq += 1;
            store.records.insert(
                record.id,
                Entry {
                    seq,
                    record: record.clone(),
                },
            );
        });

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExecutionRecord>, RepositoryError> {
        Ok(self.with_store(|store| store.records.get(&id).map(|e| e.record.clone())))
    }

    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.with_store(|store| {
            let entry = store
                .records
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound(id))?;
            let record = transition(entry, ExecutionStatus::Running)?;
            record.start_time = Some(started_at);
            record.updated_at = started_at;
            Ok(())
        })
    }

    async fn complete(
        &self,
        id: Uuid,
        update: TerminalUpdate,
    ) -> Result<ExecutionRecord, RepositoryError> {
        self.with_store(|store| {
            let entry = store
                .records
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound(id))?;
            let record = transition(entry, update.status)?;
            record.output = update.output;
            record.error_output = update.error_output;
            record.exit_code = Some(update.exit_code);
            record.end_time = Some(update.end_time);
            record.duration = record
                .start_time
                .map(|start| duration_seconds(start, update.end_time));
            record.updated_at = update.end_time;
            Ok(record.clone())
        })
    }

    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ExecutionRecord>, i64), RepositoryError> {
        Ok(self.with_store(|store| {
            let mut owned: Vec<&Entry> = store
                .records
                .values()
                .filter(|e| e.record.user_id == user_id)
                .collect();
            owned.sort_by(|a, b| {
                b.record
                    .created_at
                    .cmp(&a.record.created_at)
                    .then(b.seq.cmp(&a.seq))
            });

            let total = owned.len() as i64;
            let page = owned
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .map(|e| e.record.clone())
                .collect();
            (page, total)
        }))
    }

    async fn stats_for_user(&self, user_id: PrincipalId) -> Result<ExecutionStats, RepositoryError> {
        Ok(self.with_store(|store| {
            let mut stats = ExecutionStats::default();
            for entry in store.records.values().filter(|e| e.record.user_id == user_id) {
                tally(&mut stats, entry.record.status, 1);
            }
            stats
        }))
    }

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        Ok(self.with_store(|store| {
            let mut matching: Vec<&Entry> = store
                .records
                .values()
                .filter(|e| e.record.status == status)
                .collect();
            matching.sort_by_key(|e| e.seq);
            matching.into_iter().map(|e| e.record.clone()).collect()
        }))
    }
}
