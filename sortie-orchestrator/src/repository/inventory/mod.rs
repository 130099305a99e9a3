//! Saved inventories
//!
//! Inventories are scoped to their owner: every lookup except
//! [`InventoryRepository::find_by_id`] filters on `user_id`, and names are
//! unique per owner.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sortie_core::domain::execution::PrincipalId;
use sortie_core::domain::inventory::{Inventory, InventoryKind};
use sortie_core::dto::inventory::InventoryRequest;
use uuid::Uuid;

use super::RepositoryError;

pub use memory::InMemoryInventoryRepository;
pub use postgres::PgInventoryRepository;

/// Writable fields of an inventory
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryFields {
    pub name: String,
    pub description: String,
    pub kind: InventoryKind,
    pub content: String,
    pub is_default: bool,
}

impl From<InventoryRequest> for InventoryFields {
    fn from(req: InventoryRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            description: req.description,
            kind: req.kind.unwrap_or_default(),
            content: req.content,
            is_default: req.is_default,
        }
    }
}

/// Persistence operations on saved inventories
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Inserts an inventory; a new default clears the owner's previous one
    async fn create(
        &self,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Inventory, RepositoryError>;

    /// Replaces every field of an owned inventory
    ///
    /// `None` when `user_id` owns no inventory `id`.
    async fn update(
        &self,
        id: Uuid,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Option<Inventory>, RepositoryError>;

    /// `false` when `user_id` owns no inventory `id`
    async fn delete(&self, id: Uuid, user_id: PrincipalId) -> Result<bool, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Inventory>, RepositoryError>;

    /// Owned inventories, default first then newest first, plus the total count
    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Inventory>, i64), RepositoryError>;

    async fn find_default(&self, user_id: PrincipalId) -> Result<Option<Inventory>, RepositoryError>;
}
