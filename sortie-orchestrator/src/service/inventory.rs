//! Saved inventory management
//!
//! CRUD over the principal's inventories, plus resolution of the
//! `inventory` field of an execution request into the content written for
//! the run.

use sortie_core::domain::execution::PrincipalId;
use sortie_core::domain::inventory::Inventory;
use sortie_core::dto::inventory::{InventoryPage, InventoryRequest};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::{
    InMemoryInventoryRepository, InventoryFields, InventoryRepository, RepositoryError,
};
use crate::service::tracker::MAX_PAGE_LIMIT;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("name is required")]
    MissingName,

    #[error("content is required")]
    MissingContent,

    #[error("inventory {0} not found")]
    NotFound(Uuid),

    #[error("no default inventory")]
    NoDefault,

    #[error("inventory name already exists: {0}")]
    NameTaken(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for InventoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateName(name) => InventoryError::NameTaken(name),
            other => InventoryError::Repository(other),
        }
    }
}

/// Cheap to clone; all clones share the same store
#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn InventoryRepository>,
}

impl InventoryService {
    pub fn new(repo: Arc<dyn InventoryRepository>) -> Self {
        Self { repo }
    }

    /// Service over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryInventoryRepository::new()))
    }

    pub async fn create(
        &self,
        principal: PrincipalId,
        req: InventoryRequest,
    ) -> Result<Inventory, InventoryError> {
        let fields = checked_fields(req)?;
        let inventory = self.repo.create(principal, fields).await?;

        info!(
            inventory_id = %inventory.id,
            name = %inventory.name,
            is_default = inventory.is_default,
            user_id = principal,
            "Inventory created"
        );

        Ok(inventory)
    }

    pub async fn update(
        &self,
        id: Uuid,
        principal: PrincipalId,
        req: InventoryRequest,
    ) -> Result<Inventory, InventoryError> {
        let fields = checked_fields(req)?;
        let inventory = self
            .repo
            .update(id, principal, fields)
            .await?
            .ok_or(InventoryError::NotFound(id))?;

        debug!(inventory_id = %id, "Inventory updated");
        Ok(inventory)
    }

    pub async fn delete(&self, id: Uuid, principal: PrincipalId) -> Result<(), InventoryError> {
        if !self.repo.delete(id, principal).await? {
            return Err(InventoryError::NotFound(id));
        }

        info!(inventory_id = %id, user_id = principal, "Inventory deleted");
        Ok(())
    }

    /// An inventory owned by `principal`; others' inventories are not found
    pub async fn get(&self, id: Uuid, principal: PrincipalId) -> Result<Inventory, InventoryError> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|inventory| inventory.user_id == principal)
            .ok_or(InventoryError::NotFound(id))
    }

    pub async fn list(
        &self,
        principal: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<InventoryPage, InventoryError> {
        let offset = offset.max(0);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let (items, total) = self.repo.list_by_user(principal, offset, limit).await?;

        Ok(InventoryPage {
            items,
            total,
            offset,
            limit,
        })
    }

    pub async fn default_for(&self, principal: PrincipalId) -> Result<Inventory, InventoryError> {
        self.repo
            .find_default(principal)
            .await?
            .ok_or(InventoryError::NoDefault)
    }

    /// Turns a request's `inventory` field into the content to run with
    ///
    /// - blank: the principal's default inventory, or blank when there is
    ///   none so the runner writes its local default
    /// - an id: the content of that inventory, which must be owned
    /// - anything else: literal inventory content
    pub async fn resolve(
        &self,
        principal: PrincipalId,
        field: &str,
    ) -> Result<String, InventoryError> {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Ok(self
                .repo
                .find_default(principal)
                .await?
                .map(|inventory| inventory.content)
                .unwrap_or_default());
        }

        match Uuid::parse_str(trimmed) {
            Ok(id) => Ok(self.get(id, principal).await?.content),
            Err(_) => Ok(field.to_string()),
        }
    }
}

fn checked_fields(req: InventoryRequest) -> Result<InventoryFields, InventoryError> {
    if req.name.trim().is_empty() {
        return Err(InventoryError::MissingName);
    }

    if req.content.trim().is_empty() {
        return Err(InventoryError::MissingContent);
    }

    Ok(InventoryFields::from(req))
}
