//! System API Handlers
//!
//! Health, module catalog and binary checks.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sortie_core::dto::execution::InstallationStatus;
use sortie_core::modules::{ModuleInfo, SUPPORTED_MODULES};

use crate::service::ExecutionTracker;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /modules
/// Modules an execution may invoke
pub async fn list_modules() -> Json<&'static [ModuleInfo]> {
    Json(SUPPORTED_MODULES)
}

/// GET /system/ansible
/// Check the resolved ansible binary
pub async fn ansible_status(State(tracker): State<ExecutionTracker>) -> Json<InstallationStatus> {
    Json(tracker.check_installation().await)
}
