//! Postgres execution store
//!
//! Status guards live in the `WHERE` clause of each update, so a transition
//! either applies completely or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sortie_core::domain::execution::{ExecutionRecord, ExecutionStatus, PrincipalId};
use sortie_core::dto::execution::ExecutionStats;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ExecutionRepository, NewExecution, RepositoryError, TerminalUpdate, tally};

const COLUMNS: &str = "id, command, module, args, inventory, hosts, extra_vars, status, \
     output, error_output, exit_code, start_time, end_time, duration, user_id, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgExecutionRepository {
    pool: PgPool,
}

impl PgExecutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explains why a guarded update touched no row
    async fn rejected(
        &self,
        id: Uuid,
        to: ExecutionStatus,
    ) -> Result<RepositoryError, RepositoryError> {
        Ok(match self.find_by_id(id).await? {
            Some(current) => RepositoryError::InvalidTransition {
                id,
                from: current.status,
                to,
            },
            None => RepositoryError::NotFound(id),
        })
    }
}

#[async_trait]
impl ExecutionRepository for PgExecutionRepository {
    async fn create(&self, new: NewExecution) -> Result<ExecutionRecord, RepositoryError> {
        let record = new.into_record(Uuid::new_v4(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO executions (id, command, module, args, inventory, hosts, extra_vars,
                                    status, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(&record.command)
        .bind(&record.module)
        .bind(&record.args)
        .bind(&record.inventory)
        .bind(&record.hosts)
        .bind(&record.extra_vars)
        .bind(record.status.as_str())
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExecutionRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {COLUMNS} FROM executions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ExecutionRecord::try_from).transpose()
    }

    async fn mark_running(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = $1, start_time = $2, updated_at = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(ExecutionStatus::Running.as_str())
        .bind(started_at)
        .bind(id)
        .bind(ExecutionStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.rejected(id, ExecutionStatus::Running).await?);
        }

        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        update: TerminalUpdate,
    ) -> Result<ExecutionRecord, RepositoryError> {
        if !ExecutionStatus::Running.can_transition_to(update.status) {
            return Err(self.rejected(id, update.status).await?);
        }

        let row = sqlx::query_as::<_, ExecutionRow>(&format!(
            r#"
            UPDATE executions
            SET status = $1, output = $2, error_output = $3, exit_code = $4,
                end_time = $5, updated_at = $5,
                duration = GREATEST(0, FLOOR(EXTRACT(EPOCH FROM ($5::timestamptz - start_time))))::BIGINT
            WHERE id = $6 AND status = $7
            RETURNING {COLUMNS}
            "#
        ))
        .bind(update.status.as_str())
        .bind(&update.output)
        .bind(&update.error_output)
        .bind(update.exit_code)
        .bind(update.end_time)
        .bind(id)
        .bind(ExecutionStatus::Running.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => ExecutionRecord::try_from(row),
            None => Err(self.rejected(id, update.status).await?),
        }
    }

    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ExecutionRecord>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM executions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM executions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(offset.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(ExecutionRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total))
    }

    async fn stats_for_user(&self, user_id: PrincipalId) -> Result<ExecutionStats, RepositoryError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM executions WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ExecutionStats::default();
        for (status, count) in counts {
            tally(&mut stats, status.parse()?, count);
        }

        Ok(stats)
    }

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, ExecutionRow>(&format!(
            "SELECT {COLUMNS} FROM executions WHERE status = $1 ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExecutionRecord::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: Uuid,
    command: String,
    module: String,
    args: String,
    inventory: String,
    hosts: String,
    extra_vars: Option<String>,
    status: String,
    output: String,
    error_output: String,
    exit_code: Option<i32>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration: Option<i64>,
    user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExecutionRow> for ExecutionRecord {
    type Error = RepositoryError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        Ok(ExecutionRecord {
            id: row.id,
            command: row.command,
            module: row.module,
            args: row.args,
            inventory: row.inventory,
            hosts: row.hosts,
            extra_vars: row.extra_vars,
            status: row.status.parse()?,
            output: row.output,
            error_output: row.error_output,
            exit_code: row.exit_code,
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
