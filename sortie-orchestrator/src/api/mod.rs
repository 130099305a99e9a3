//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod execution;
pub mod inventory;
pub mod principal;
pub mod system;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::{ExecutionTracker, InventoryService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub tracker: ExecutionTracker,
    pub inventories: InventoryService,
}

impl FromRef<AppState> for ExecutionTracker {
    fn from_ref(state: &AppState) -> Self {
        state.tracker.clone()
    }
}

impl FromRef<AppState> for InventoryService {
    fn from_ref(state: &AppState) -> Self {
        state.inventories.clone()
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(system::health_check))
        // Execution endpoints
        .route(
            "/executions",
            post(execution::create_execution).get(execution::list_executions),
        )
        .route("/executions/stats", get(execution::execution_stats))
        .route("/executions/{id}", get(execution::get_execution))
        .route("/executions/{id}/live", get(execution::get_live_output))
        // Inventory endpoints
        .route(
            "/inventories",
            post(inventory::create_inventory).get(inventory::list_inventories),
        )
        .route("/inventories/default", get(inventory::get_default_inventory))
        .route(
            "/inventories/{id}",
            get(inventory::get_inventory)
                .put(inventory::update_inventory)
                .delete(inventory::delete_inventory),
        )
        // System endpoints
        .route("/modules", get(system::list_modules))
        .route("/system/ansible", get(system::ansible_status))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
