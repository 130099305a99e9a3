//! In-memory inventory store

use async_trait::async_trait;
use chrono::Utc;
use sortie_core::domain::execution::PrincipalId;
use sortie_core::domain::inventory::Inventory;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{InventoryFields, InventoryRepository};
use crate::repository::RepositoryError;

#[derive(Debug, Default)]
struct Store {
    inventories: HashMap<Uuid, Entry>,
    next_seq: u64,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    inventory: Inventory,
}

impl Store {
    fn ensure_name_free(
        &self,
        user_id: PrincipalId,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let taken = self.inventories.values().any(|e| {
            e.inventory.user_id == user_id
                && e.inventory.name == name
                && Some(e.inventory.id) != except
        });
        if taken {
            return Err(RepositoryError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn clear_default(&mut self, user_id: PrincipalId, except: Option<Uuid>) {
        let now = Utc::now();
        for entry in self.inventories.values_mut() {
            let inventory = &mut entry.inventory;
            if inventory.user_id == user_id && inventory.is_default && Some(inventory.id) != except {
                inventory.is_default = false;
                inventory.updated_at = now;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryInventoryRepository {
    store: Mutex<Store>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> T) -> T {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut store)
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn create(
        &self,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Inventory, RepositoryError> {
        self.with_store(|store| {
            store.ensure_name_free(user_id, &fields.name, None)?;
            if fields.is_default {
                store.clear_default(user_id, None);
            }

            let now = Utc::now();
            let inventory = Inventory {
                id: Uuid::new_v4(),
                name: fields.name,
                description: fields.description,
                kind: fields.kind,
                content: fields.content,
                is_default: fields.is_default,
                user_id,
                created_at: now,
                updated_at: now,
            };

            let seq = store.next_seq;
            store.next_seq += 1;
            store.inventories.insert(
                inventory.id,
                Entry {
                    seq,
                    inventory: inventory.clone(),
                },
            );
            Ok(inventory)
        })
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: PrincipalId,
        fields: InventoryFields,
    ) -> Result<Option<Inventory>, RepositoryError> {
        self.with_store(|store| {
            let owned = store
                .inventories
                .get(&id)
                .is_some_and(|e| e.inventory.user_id == user_id);
            if !owned {
                return Ok(None);
            }

            store.ensure_name_free(user_id, &fields.name, Some(id))?;
            if fields.is_default {
                store.clear_default(user_id, Some(id));
            }

            let Some(entry) = store.inventories.get_mut(&id) else {
                return Ok(None);
            };
            let inventory = &mut entry.inventory;
            inventory.name = fields.name;
            inventory.description = fields.description;
            inventory.kind = fields.kind;
            inventory.content = fields.content;
            inventory.is_default = fields.is_default;
            inventory.updated_at = Utc::now();
            Ok(Some(inventory.clone()))
        })
    }

    async fn delete(&self, id: Uuid, user_id: PrincipalId) -> Result<bool, RepositoryError> {
        Ok(self.with_store(|store| {
            let owned = store
                .inventories
                .get(&id)
                .is_some_and(|e| e.inventory.user_id == user_id);
            owned && store.inventories.remove(&id).is_some()
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Inventory>, RepositoryError> {
        Ok(self.with_store(|store| store.inventories.get(&id).map(|e| e.inventory.clone())))
    }

    async fn list_by_user(
        &self,
        user_id: PrincipalId,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Inventory>, i64), RepositoryError> {
        Ok(self.with_store(|store| {
            let mut owned: Vec<&Entry> = store
                .inventories
                .values()
                .filter(|e| e.inventory.user_id == user_id)
                .collect();
            owned.sort_by(|a, b| {
                b.inventory
                    .is_default
                    .cmp(&a.inventory.is_default)
                    .then(b.inventory.created_at.cmp(&a.inventory.created_at))
                    .then(b.seq.cmp(&a.seq))
            });

            let total = owned.len() as i64;
            let page = owned
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .map(|e| e.inventory.clone())
                .collect();
            (page, total)
        }))
    }

    async fn find_default(&self, user_id: PrincipalId) -> Result<Option<Inventory>, RepositoryError> {
        Ok(self.with_store(|store| {
            store
                .inventories
                .values()
                .find(|e| e.inventory.user_id == user_id && e.inventory.is_default)
                .map(|e| e.inventory.clone())
        }))
    }
}
