//! Inventory DTOs

use serde::{Deserialize, Serialize};

use crate::domain::inventory::{Inventory, InventoryKind};

/// Create or replace a saved inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `static`
    #[serde(default, rename = "type")]
    pub kind: Option<InventoryKind>,
    #[serde(default)]
    pub content: String,
    /// Makes this the owner's only default inventory
    #[serde(default)]
    pub is_default: bool,
}

impl InventoryRequest {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// One page of inventories, default first then newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPage {
    pub items: Vec<Inventory>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}
