//! Inventory API Handlers
//!
//! CRUD over the caller's saved inventories.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sortie_core::domain::inventory::Inventory;
use sortie_core::dto::inventory::{InventoryPage, InventoryRequest};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::execution::PageQuery;
use crate::api::principal::Principal;
use crate::service::InventoryService;
use crate::service::tracker::DEFAULT_PAGE_LIMIT;

/// POST /inventories
pub async fn create_inventory(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
    Json(req): Json<InventoryRequest>,
) -> ApiResult<(StatusCode, Json<Inventory>)> {
    let inventory = inventories.create(user_id, req).await?;
    Ok((StatusCode::CREATED, Json(inventory)))
}

/// GET /inventories
/// List the caller's inventories, default first
pub async fn list_inventories(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<InventoryPage>> {
    let page = inventories
        .list(
            user_id,
            page.offset.unwrap_or(0),
            page.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;

    Ok(Json(page))
}

/// GET /inventories/default
pub async fn get_default_inventory(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
) -> ApiResult<Json<Inventory>> {
    Ok(Json(inventories.default_for(user_id).await?))
}

/// GET /inventories/{id}
pub async fn get_inventory(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Inventory>> {
    Ok(Json(inventories.get(id, user_id).await?))
}

/// PUT /inventories/{id}
/// Replace every field of an inventory
pub async fn update_inventory(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<InventoryRequest>,
) -> ApiResult<Json<Inventory>> {
    Ok(Json(inventories.update(id, user_id, req).await?))
}

/// DELETE /inventories/{id}
pub async fn delete_inventory(
    State(inventories): State<InventoryService>,
    Principal(user_id): Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    inventories.delete(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
