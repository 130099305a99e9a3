//! Postgres inventory store
//!
//! Clearing the previous default and writing the new one share a
//! transaction; a partial unique index backs the one-default rule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sortie_core::domain::execution::PrincipalId;
use sortie_core::domain::inventory::Inventory;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{InventoryFields, InventoryRepository};
use crate::repository::RepositoryError;

const COLUMNS: &str =
    "id, name, description, kind, content, is_default, user_id, created_at, updated_at";

/// Constraint backing per-owner name uniqueness, see `db::run_migrations`
const NAME_CONSTRAINT: &str = "uq_inventories_user_name";

#[derive(Debug, Clone)]
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn clear_default(
    tx: &mut Transaction<'_, Postgres>,
    user_id: PrincipalId,
    except: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE inventories
        SET is_default = FALSE, updated_at = $1
        WHERE user_id = $2 AND is_default AND id <> $3
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(except)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Maps a name collision to [`RepositoryError::DuplicateName`]
fn write_error(e: sqlx::Error, name: &str) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(NAME_CONSTRAINT) =>
        {
            RepositoryError::DuplicateName(name.to_string())
        }
        _ => RepositoryError::Database(e),
    }
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn create(
        &self,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Inventory, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if fields.is_default {
            clear_default(&mut tx, user_id, id, now).await?;
        }

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventories (id, name, description, kind, content, is_default,
                                     user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.kind.as_str())
        .bind(&fields.content)
        .bind(fields.is_default)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, &fields.name))?;

        tx.commit().await?;
        Inventory::try_from(row)
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Option<Inventory>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if fields.is_default {
            clear_default(&mut tx, user_id, id, now).await?;
        }

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventories
            SET name = $1, description = $2, kind = $3, content = $4,
                is_default = $5, updated_at = $6
            WHERE id = $7 AND user_id = $8
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.kind.as_str())
        .bind(&fields.content)
        .bind(fields.is_default)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| write_error(e, &fields.name))?;

        let Some(row) = row else {
            // Not owned: drop the transaction so a cleared default is restored
            tx.rollback().await?;
            return Ok(None);
        };

        tx.commit().await?;
        Inventory::try_from(row).map(Some)
    }

    async fn delete(&self, id: Uuid, user_id: PrincipalId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM inventories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Inventory>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {COLUMNS} FROM inventories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Inventory::try_from).transpose()
    }

    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Inventory>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventories WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM inventories
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(offset.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        let inventories = rows
            .into_iter()
            .map(Inventory::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((inventories, total))
    }

    async fn find_default(&self, user_id: PrincipalId) -> Result<Option<Inventory>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {COLUMNS} FROM inventories WHERE user_id = $1 AND is_default"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Inventory::try_from).transpose()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct InventoryRow {
    id: Uuid,
    name: String,
    description: String,
    kind: String,
    content: String,
    is_default: bool,
    user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryRow> for Inventory {
    type Error = RepositoryError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        Ok(Inventory {
            id: row.id,
            name: row.name,
            description: row.description,
            kind: row.kind.parse()?,
            content: row.content,
            is_default: row.is_default,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
