//! Saved inventory types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::execution::PrincipalId;

/// Named inventory owned by one principal
///
/// At most one inventory per principal is the default; it stands in for
/// requests that carry no inventory of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: Uuid,
    /// Unique per owner
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InventoryKind,
    /// Inventory file content, written verbatim for executions
    pub content: String,
    pub is_default: bool,
    pub user_id: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How the inventory content is meant to be read
///
/// Stored as metadata only; both kinds are handed to the binary as a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    #[default]
    Static,
    Dynamic,
}

impl InventoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryKind::Static => "static",
            InventoryKind::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown inventory type: {0}")]
pub struct UnknownInventoryKind(pub String);

impl FromStr for InventoryKind {
    type Err = UnknownInventoryKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(InventoryKind::Static),
            "dynamic" => Ok(InventoryKind::Dynamic),
            other => Err(UnknownInventoryKind(other.to_string())),
        }
    }
}
